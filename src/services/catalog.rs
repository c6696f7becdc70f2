use crate::auth::guard;
use crate::errors::{AppError, FieldError};
use crate::models::category::{Category, CategoryDetail, CategoryWithCount};
use crate::models::product::{
    HomePage, ImageUpload, Product, ProductPage, ProductPayload, ProductWithCategory,
};
use crate::services::activity::log_activity;
use crate::uploads;
use crate::validation;
use crate::AppState;

/// Jumlah produk per halaman listing. Nilai tetap, bukan konfigurasi.
pub const PAGE_SIZE: i64 = 4;

/// Batas stok menipis: stok di bawah ini (tapi di atas 0) dianggap hampir habis.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Listing produk untuk halaman katalog, dengan filter kategori opsional.
/// Halaman di luar rentang mengembalikan slice kosong, bukan error.
pub async fn list_products(
    state: &AppState,
    category_id: Option<i64>,
    page: i64,
) -> Result<ProductPage, AppError> {
    let mut count_query = "SELECT COUNT(*) FROM products p WHERE 1=1".to_string();
    let mut query = "
        SELECT p.*, c.name as category_name
        FROM products p
        JOIN categories c ON p.category_id = c.id
        WHERE 1=1
    "
    .to_string();

    if let Some(id) = category_id {
        count_query.push_str(&format!(" AND p.category_id = {}", id));
        query.push_str(&format!(" AND p.category_id = {}", id));
    }

    let (total,): (i64,) = sqlx::query_as(&count_query).fetch_one(&state.db).await?;
    let total_pages = (total + PAGE_SIZE - 1) / PAGE_SIZE;

    // SQLite memperlakukan OFFSET negatif sebagai 0, jadi halaman < 1
    // harus ditangani di sini supaya tetap menghasilkan slice kosong
    let items = if page < 1 {
        Vec::new()
    } else {
        query.push_str(&format!(
            " ORDER BY p.id ASC LIMIT {} OFFSET {}",
            PAGE_SIZE,
            (page - 1) * PAGE_SIZE
        ));
        sqlx::query_as::<_, ProductWithCategory>(&query)
            .fetch_all(&state.db)
            .await?
    };

    Ok(ProductPage {
        items,
        total,
        page,
        per_page: PAGE_SIZE,
        total_pages,
    })
}

/// Cari produk berdasarkan nama (substring, case-insensitive).
pub async fn search_products(
    state: &AppState,
    keyword: &str,
) -> Result<Vec<ProductWithCategory>, AppError> {
    let pattern = format!("%{}%", keyword.trim().to_lowercase());

    let products = sqlx::query_as::<_, ProductWithCategory>(
        "
        SELECT p.*, c.name as category_name
        FROM products p
        JOIN categories c ON p.category_id = c.id
        WHERE LOWER(p.name) LIKE ?
        ORDER BY p.name ASC
        ",
    )
    .bind(&pattern)
    .fetch_all(&state.db)
    .await?;

    Ok(products)
}

/// Ambil 1 produk untuk halaman detail.
pub async fn get_product(state: &AppState, id: i64) -> Result<ProductWithCategory, AppError> {
    let product = sqlx::query_as::<_, ProductWithCategory>(
        "
        SELECT p.*, c.name as category_name
        FROM products p
        JOIN categories c ON p.category_id = c.id
        WHERE p.id = ?
        ",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Produk tidak ditemukan".into()))?;

    Ok(product)
}

/// Buat produk baru (staff only). Gambar wajib diisi.
pub async fn create_product(
    state: &AppState,
    session_token: &str,
    payload: ProductPayload,
    image: Option<ImageUpload>,
) -> Result<Product, AppError> {
    let session = guard::validate_staff(state, session_token)?;

    let mut errors =
        validation::validate_product_fields(&payload.name, payload.price, payload.stock);

    let category: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
        .bind(payload.category_id)
        .fetch_optional(&state.db)
        .await?;
    if category.is_none() {
        errors.push(FieldError::new("category_id", "Kategori tidak ditemukan"));
    }

    let upload = match image {
        Some(upload) => upload,
        None => {
            errors.push(FieldError::new("image", "Gambar produk wajib diisi"));
            return Err(AppError::Validation(errors));
        }
    };

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let file_name = uploads::store_image(&state.images_dir, &upload.file_name, &upload.bytes)?;

    let trimmed = payload.name.trim();
    let result = sqlx::query(
        "INSERT INTO products (name, price, stock, category_id, image) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(trimmed)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.category_id)
    .bind(&file_name)
    .execute(&state.db)
    .await;

    match result {
        Ok(res) => {
            let id = res.last_insert_rowid();

            log_activity(
                &state.db,
                Some(session.user_id),
                "CREATE_PRODUCT",
                &format!("Membuat produk baru: {}", trimmed),
                None,
            )
            .await;

            let new_product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
                .bind(id)
                .fetch_one(&state.db)
                .await?;
            Ok(new_product)
        }
        Err(e) => {
            // Insert gagal: buang file gambar yang terlanjur tersimpan
            uploads::delete_image(&state.images_dir, &file_name);
            Err(e.into())
        }
    }
}

/// Update produk (staff only). Gambar opsional; kalau diganti,
/// file gambar lama ikut dihapus.
pub async fn update_product(
    state: &AppState,
    session_token: &str,
    id: i64,
    payload: ProductPayload,
    image: Option<ImageUpload>,
) -> Result<Product, AppError> {
    let session = guard::validate_staff(state, session_token)?;

    let mut errors =
        validation::validate_product_fields(&payload.name, payload.price, payload.stock);

    let category: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE id = ?")
        .bind(payload.category_id)
        .fetch_optional(&state.db)
        .await?;
    if category.is_none() {
        errors.push(FieldError::new("category_id", "Kategori tidak ditemukan"));
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let existing = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produk tidak ditemukan".into()))?;

    let new_image = match &image {
        Some(upload) => Some(uploads::store_image(
            &state.images_dir,
            &upload.file_name,
            &upload.bytes,
        )?),
        None => None,
    };

    let trimmed = payload.name.trim();
    sqlx::query(
        "UPDATE products
         SET name = ?, price = ?, stock = ?, category_id = ?,
             image = COALESCE(?, image), updated_at = CURRENT_TIMESTAMP
         WHERE id = ?",
    )
    .bind(trimmed)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.category_id)
    .bind(&new_image)
    .bind(id)
    .execute(&state.db)
    .await?;

    // Gambar diganti: hapus file lama
    if new_image.is_some() {
        if let Some(old) = existing.image.as_deref() {
            uploads::delete_image(&state.images_dir, old);
        }
    }

    log_activity(
        &state.db,
        Some(session.user_id),
        "UPDATE_PRODUCT",
        &format!("Memperbarui produk ID {}: {}", id, trimmed),
        None,
    )
    .await;

    let updated = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await?;
    Ok(updated)
}

/// Hapus produk beserta file gambarnya (staff only).
pub async fn delete_product(
    state: &AppState,
    session_token: &str,
    id: i64,
) -> Result<(), AppError> {
    let session = guard::validate_staff(state, session_token)?;

    let existing = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produk tidak ditemukan".into()))?;

    sqlx::query("DELETE FROM products WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if let Some(image) = existing.image.as_deref() {
        uploads::delete_image(&state.images_dir, image);
    }

    log_activity(
        &state.db,
        Some(session.user_id),
        "DELETE_PRODUCT",
        &format!("Menghapus produk: {}", existing.name),
        None,
    )
    .await;

    Ok(())
}

/// Daftar produk dengan stok menipis (staff only).
pub async fn get_low_stock_products(
    state: &AppState,
    session_token: &str,
) -> Result<Vec<ProductWithCategory>, AppError> {
    guard::validate_staff(state, session_token)?;

    let products = sqlx::query_as::<_, ProductWithCategory>(
        "
        SELECT p.*, c.name as category_name
        FROM products p
        JOIN categories c ON p.category_id = c.id
        WHERE p.stock > 0 AND p.stock < ?
        ORDER BY p.stock ASC
        ",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_all(&state.db)
    .await?;

    Ok(products)
}

/// Ambil daftar kategori + jumlah produk.
pub async fn list_categories(state: &AppState) -> Result<Vec<CategoryWithCount>, AppError> {
    let rows: Vec<(i64, String, i64)> = sqlx::query_as(
        "SELECT c.id, c.name, COUNT(p.id) as product_count
         FROM categories c
         LEFT JOIN products p ON c.id = p.category_id
         GROUP BY c.id
         ORDER BY c.name ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, product_count)| CategoryWithCount {
            id,
            name,
            product_count,
        })
        .collect())
}

/// Detail kategori beserta produk-produknya.
pub async fn get_category(state: &AppState, id: i64) -> Result<CategoryDetail, AppError> {
    let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Kategori tidak ditemukan".into()))?;

    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE category_id = ? ORDER BY name ASC")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(CategoryDetail { category, products })
}

/// Tambah kategori baru (staff only).
pub async fn create_category(
    state: &AppState,
    session_token: &str,
    name: &str,
) -> Result<Category, AppError> {
    let session = guard::validate_staff(state, session_token)?;

    if let Err(msg) = validation::validate_category_name(name) {
        return Err(AppError::invalid("name", msg));
    }

    let trimmed = name.trim();
    let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
        .bind(trimmed)
        .execute(&state.db)
        .await;

    match result {
        Ok(res) => {
            let id = res.last_insert_rowid();

            log_activity(
                &state.db,
                Some(session.user_id),
                "CREATE_CATEGORY",
                &format!("Membuat kategori baru: {}", trimmed),
                None,
            )
            .await;

            Ok(Category {
                id,
                name: trimmed.to_string(),
            })
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::invalid("name", "Kategori sudah ada"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Ganti nama kategori (staff only).
pub async fn rename_category(
    state: &AppState,
    session_token: &str,
    id: i64,
    name: &str,
) -> Result<Category, AppError> {
    let session = guard::validate_staff(state, session_token)?;

    if let Err(msg) = validation::validate_category_name(name) {
        return Err(AppError::invalid("name", msg));
    }

    let trimmed = name.trim();
    let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
        .bind(trimmed)
        .bind(id)
        .execute(&state.db)
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => {
            Err(AppError::NotFound("Kategori tidak ditemukan".into()))
        }
        Ok(_) => {
            log_activity(
                &state.db,
                Some(session.user_id),
                "UPDATE_CATEGORY",
                &format!("Mengganti nama kategori ID {}: {}", id, trimmed),
                None,
            )
            .await;

            Ok(Category {
                id,
                name: trimmed.to_string(),
            })
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::invalid("name", "Kategori sudah ada"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Hapus kategori (staff only). Kategori yang masih punya produk
/// tidak bisa dihapus.
pub async fn delete_category(
    state: &AppState,
    session_token: &str,
    id: i64,
) -> Result<(), AppError> {
    let session = guard::validate_staff(state, session_token)?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT name FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let name = match existing {
        Some((name,)) => name,
        None => return Err(AppError::NotFound("Kategori tidak ditemukan".into())),
    };

    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await;

    match result {
        Ok(_) => {
            log_activity(
                &state.db,
                Some(session.user_id),
                "DELETE_CATEGORY",
                &format!("Menghapus kategori: {}", name),
                None,
            )
            .await;
            Ok(())
        }
        Err(sqlx::Error::Database(err)) if err.is_foreign_key_violation() => Err(
            AppError::invalid("category", "Kategori masih memiliki produk"),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Data halaman depan toko: 6 kategori pertama + 6 produk terbaru.
pub async fn get_home(state: &AppState) -> Result<HomePage, AppError> {
    let categories =
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name ASC LIMIT 6")
            .fetch_all(&state.db)
            .await?;

    let products = sqlx::query_as::<_, ProductWithCategory>(
        "
        SELECT p.*, c.name as category_name
        FROM products p
        JOIN categories c ON p.category_id = c.id
        ORDER BY p.id DESC
        LIMIT 6
        ",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(HomePage {
        categories,
        products,
    })
}
