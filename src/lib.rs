pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod logger;
pub mod models;
pub mod rate_limiter;
pub mod services;
pub mod uploads;
pub mod validation;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use auth::session::SessionStore;
use errors::AppError;
use models::cart::CartStore;

/// State global aplikasi, dipegang host dan dibagikan ke semua service.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub sessions: Mutex<SessionStore>,
    pub carts: Mutex<CartStore>,
    /// Direktori penyimpanan gambar produk (di dalam data_dir).
    pub images_dir: PathBuf,
}

/// Inisialisasi aplikasi: konfigurasi, logger, lalu database.
/// Dipanggil host sekali saat startup. data_dir adalah direktori data
/// aplikasi; database, log, dan gambar upload semuanya di dalamnya.
pub async fn init_app(data_dir: &Path) -> Result<AppState, AppError> {
    let app_config = config::init_config();

    if let Err(e) = logger::init_global_logger(data_dir) {
        eprintln!("⚠️  Warning: gagal inisialisasi logger: {}", e);
    }

    app_config.validate().map_err(AppError::Internal)?;

    log_info!(
        "APP",
        "Application starting",
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "environment": app_config.environment.as_str(),
            "data_dir": data_dir.to_string_lossy()
        })
    );

    let pool = database::connection::init_db(data_dir).await?;

    Ok(AppState {
        db: pool,
        sessions: Mutex::new(SessionStore::new()),
        carts: Mutex::new(CartStore::new()),
        images_dir: app_config.get_images_dir(data_dir),
    })
}
