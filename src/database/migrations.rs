use sqlx::SqlitePool;

/// Menjalankan semua migrasi database (CREATE TABLE IF NOT EXISTS + seed default roles).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: users
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            name            TEXT     NOT NULL,
            username        TEXT     NOT NULL UNIQUE,
            password_hash   TEXT     NOT NULL,
            is_active       INTEGER  NOT NULL DEFAULT 1,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            last_login_at   DATETIME
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: roles + user_roles
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS roles (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT    NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_roles (
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, role_id)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles(role_id)")
        .execute(pool)
        .await?;

    // ── Seed default roles (OR IGNORE = tidak timpa jika sudah ada) ──
    let default_roles = ["Admin", "Manager", "Client"];

    for role in default_roles {
        sqlx::query("INSERT OR IGNORE INTO roles (name) VALUES (?)")
            .bind(role)
            .execute(pool)
            .await?;
    }

    // ═══════════════════════════════════════
    // TABLE: categories
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT    NOT NULL UNIQUE
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: products
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER  NOT NULL REFERENCES categories(id),
            name        TEXT     NOT NULL,
            price       REAL     NOT NULL CHECK(price >= 0),
            stock       INTEGER  NOT NULL DEFAULT 0 CHECK(stock >= 0),
            image       TEXT,
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_name ON products(name)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: orders + order_items
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id           INTEGER  PRIMARY KEY AUTOINCREMENT,
            order_date   DATETIME DEFAULT CURRENT_TIMESTAMP,
            total_amount REAL     NOT NULL CHECK(total_amount >= 0)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(order_date)")
        .execute(pool)
        .await?;

    // product_name disimpan denormalized: riwayat pesanan tetap utuh
    // walau produk katalognya dihapus
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id     INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_name TEXT    NOT NULL,
            quantity     INTEGER NOT NULL CHECK(quantity > 0),
            price        REAL    NOT NULL CHECK(price >= 0)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: wishlists + wishlist_items
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wishlists (
            id           INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER  NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
            created_date DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_date DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // Tanpa UNIQUE(wishlist_id, product_id): duplikasi dicegah lewat
    // existence check di service layer
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS wishlist_items (
            id          INTEGER  PRIMARY KEY AUTOINCREMENT,
            wishlist_id INTEGER  NOT NULL REFERENCES wishlists(id) ON DELETE CASCADE,
            product_id  INTEGER  NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            added_date  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_wishlist_items_wishlist ON wishlist_items(wishlist_id)",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: activity_logs (Audit Trail)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            action      TEXT    NOT NULL, -- 'LOGIN', 'CREATE_PRODUCT', 'DELETE_CATEGORY', etc.
            description TEXT    NOT NULL,
            metadata    TEXT,             -- JSON string for extra data
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // MIGRASI: Kolom baru (ALTER TABLE, aman untuk data existing)
    // ═══════════════════════════════════════

    // Penanda wishlist di listing produk
    safe_add_column(
        pool,
        "products",
        "is_in_wishlist",
        "INTEGER NOT NULL DEFAULT 0",
    )
    .await;

    Ok(())
}

/// Helper: ALTER TABLE ADD COLUMN yang aman (abaikan jika kolom sudah ada).
async fn safe_add_column(pool: &SqlitePool, table: &str, column: &str, col_type: &str) {
    let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, col_type);
    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => {}
        Err(e) => {
            let msg = e.to_string();
            // SQLite error jika kolom sudah ada: "duplicate column name"
            if !msg.contains("duplicate column") {
                eprintln!("Migration warning: {}", msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        // Jalankan ulang: CREATE IF NOT EXISTS + OR IGNORE + safe_add_column
        run_migrations(&pool).await.unwrap();

        let (role_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(role_count, 3);
    }

    #[tokio::test]
    async fn test_default_roles_seeded() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();

        let roles: Vec<(String,)> = sqlx::query_as("SELECT name FROM roles ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<&str> = roles.iter().map(|(n,)| n.as_str()).collect();
        assert_eq!(names, vec!["Admin", "Manager", "Client"]);
    }
}
