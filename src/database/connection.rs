use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use super::migrations::run_migrations;
use crate::config::get_config;
use crate::errors::AppError;
use crate::log_info;

/// Inisialisasi database SQLite dengan connection pooling yang optimal.
/// File database disimpan di direktori yang diberikan (biasanya data dir aplikasi).
///
/// Features:
/// - WAL mode untuk concurrent reads/writes
/// - Connection pooling dengan configurable size
/// - Foreign keys enforcement
/// - Busy timeout untuk handle concurrent access
pub async fn init_db(app_data_dir: &Path) -> Result<SqlitePool, AppError> {
    // Pastikan direktori data ada
    std::fs::create_dir_all(app_data_dir)?;

    let config = get_config();
    let db_path = app_data_dir.join(&config.database.path);
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool_options = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(
            config.database.connect_timeout_secs,
        ))
        .idle_timeout(std::time::Duration::from_secs(
            config.database.idle_timeout_secs,
        ));

    let pool = pool_options.connect_with(options).await?;

    // Run migrations
    run_migrations(&pool).await?;

    log_info!(
        "DATABASE",
        "Connection pool initialized",
        serde_json::json!({
            "min": config.database.min_connections,
            "max": config.database.max_connections,
            "db": db_path.display().to_string(),
        })
    );

    Ok(pool)
}
