//! Penyimpanan gambar produk
//!
//! Gambar disimpan di direktori images dengan nama `{uuid}_{nama asli}`
//! supaya dua upload dengan nama file sama tidak saling timpa.

use std::path::Path;

use uuid::Uuid;

use crate::config;
use crate::errors::AppError;

/// Ekstensi gambar yang diterima
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Simpan gambar produk dan kembalikan nama file yang dihasilkan.
pub fn store_image(
    images_dir: &Path,
    original_name: &str,
    bytes: &[u8],
) -> Result<String, AppError> {
    // Ambil hanya nama file, buang komponen path dari client
    let base_name = Path::new(original_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    if base_name.is_empty() {
        return Err(AppError::invalid("image", "Nama file gambar tidak valid"));
    }

    // Validasi ekstensi
    let ext = Path::new(base_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::invalid(
            "image",
            "Format file harus PNG, JPG, JPEG, atau WEBP",
        ));
    }

    // Validasi ukuran
    let max_mb = config::get_config().uploads.max_image_size_mb;
    if bytes.len() as u64 > max_mb * 1024 * 1024 {
        return Err(AppError::invalid(
            "image",
            format!("Ukuran file maksimal {}MB", max_mb),
        ));
    }

    std::fs::create_dir_all(images_dir)?;

    let file_name = format!("{}_{}", Uuid::new_v4(), base_name);
    std::fs::write(images_dir.join(&file_name), bytes)?;

    Ok(file_name)
}

/// Hapus gambar produk lama. File yang sudah tidak ada diabaikan.
pub fn delete_image(images_dir: &Path, file_name: &str) {
    // Tolak nama yang mengandung komponen path
    if file_name.is_empty()
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return;
    }

    let path = images_dir.join(file_name);
    if path.exists() {
        let _ = std::fs::remove_file(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_images_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("toko-test-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn test_store_and_delete_image() {
        let dir = temp_images_dir("store");
        let name = store_image(&dir, "foto produk.png", b"fake-png").unwrap();
        assert!(name.ends_with("_foto produk.png"));
        assert!(dir.join(&name).exists());

        delete_image(&dir, &name);
        assert!(!dir.join(&name).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unique_names_for_same_file() {
        let dir = temp_images_dir("unik");
        let first = store_image(&dir, "foto.png", b"a").unwrap();
        let second = store_image(&dir, "foto.png", b"b").unwrap();
        assert_ne!(first, second);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let dir = temp_images_dir("ext");
        assert!(store_image(&dir, "berkas.exe", b"xx").is_err());
        assert!(store_image(&dir, "tanpa-ekstensi", b"xx").is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_strips_client_path() {
        let dir = temp_images_dir("path");
        let name = store_image(&dir, "/tmp/somewhere/foto.jpg", b"fake-jpg").unwrap();
        assert!(name.ends_with("_foto.jpg"));
        assert!(!name.contains('/'));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_delete_ignores_traversal() {
        let dir = temp_images_dir("trav");
        // Tidak boleh menyentuh file di luar direktori images
        delete_image(&dir, "../../etc/passwd");
        delete_image(&dir, "");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
