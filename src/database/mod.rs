pub mod connection;
pub mod migrations;

/// Pool SQLite in-memory untuk test. Satu koneksi saja:
/// tiap koneksi `sqlite::memory:` membuka database terpisah.
#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("gagal membuka database in-memory");

    migrations::run_migrations(&pool)
        .await
        .expect("migrasi test database gagal");

    pool
}
