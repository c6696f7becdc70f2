use sqlx::SqlitePool;

use crate::auth::guard;
use crate::errors::AppError;
use crate::models::wishlist::{WishlistProduct, WishlistToggle};
use crate::AppState;

/// Wishlist user dibuat lazy: baris `wishlists` baru muncul saat
/// pertama kali dibutuhkan.
async fn ensure_wishlist(db: &SqlitePool, user_id: i64) -> Result<i64, AppError> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM wishlists WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO wishlists (user_id) VALUES (?)")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Tambah produk ke wishlist user. Mengembalikan true kalau item baru
/// benar-benar masuk; false kalau produk sudah ada di wishlist.
pub async fn add_to_wishlist(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> Result<bool, AppError> {
    let session = guard::validate_session(state, session_token)?;

    let product: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = ?")
        .bind(product_id)
        .fetch_optional(&state.db)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound("Produk tidak ditemukan".into()));
    }

    let wishlist_id = ensure_wishlist(&state.db, session.user_id).await?;

    // Duplikasi dicegah di sini, bukan lewat UNIQUE constraint
    let already: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM wishlist_items WHERE wishlist_id = ? AND product_id = ?",
    )
    .bind(wishlist_id)
    .bind(product_id)
    .fetch_optional(&state.db)
    .await?;

    if already.is_some() {
        return Ok(false);
    }

    sqlx::query("INSERT INTO wishlist_items (wishlist_id, product_id) VALUES (?, ?)")
        .bind(wishlist_id)
        .bind(product_id)
        .execute(&state.db)
        .await?;

    sqlx::query("UPDATE wishlists SET updated_date = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(wishlist_id)
        .execute(&state.db)
        .await?;

    // Penanda untuk listing produk
    sqlx::query("UPDATE products SET is_in_wishlist = 1 WHERE id = ?")
        .bind(product_id)
        .execute(&state.db)
        .await?;

    Ok(true)
}

/// Buang produk dari wishlist user. Mengembalikan true kalau memang
/// ada yang terhapus.
pub async fn remove_from_wishlist(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> Result<bool, AppError> {
    let session = guard::validate_session(state, session_token)?;

    let wishlist: Option<(i64,)> = sqlx::query_as("SELECT id FROM wishlists WHERE user_id = ?")
        .bind(session.user_id)
        .fetch_optional(&state.db)
        .await?;
    let wishlist_id = match wishlist {
        Some((id,)) => id,
        None => return Ok(false),
    };

    let result = sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = ? AND product_id = ?")
        .bind(wishlist_id)
        .bind(product_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE wishlists SET updated_date = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(wishlist_id)
        .execute(&state.db)
        .await?;

    sqlx::query("UPDATE products SET is_in_wishlist = 0 WHERE id = ?")
        .bind(product_id)
        .execute(&state.db)
        .await?;

    Ok(true)
}

/// Cek apakah produk ada di wishlist user.
pub async fn is_in_wishlist(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> Result<bool, AppError> {
    let session = guard::validate_session(state, session_token)?;

    let found: Option<(i64,)> = sqlx::query_as(
        "SELECT wi.id
         FROM wishlist_items wi
         JOIN wishlists w ON wi.wishlist_id = w.id
         WHERE w.user_id = ? AND wi.product_id = ?",
    )
    .bind(session.user_id)
    .bind(product_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(found.is_some())
}

/// Jumlah item wishlist user (0 kalau wishlist belum pernah dibuat).
pub async fn wishlist_count(state: &AppState, session_token: &str) -> Result<i64, AppError> {
    let session = guard::validate_session(state, session_token)?;

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM wishlist_items wi
         JOIN wishlists w ON wi.wishlist_id = w.id
         WHERE w.user_id = ?",
    )
    .bind(session.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(count)
}

/// Toggle wishlist dari tombol hati di UI. Tidak pernah error:
/// kegagalan dikembalikan sebagai success=false + message.
pub async fn toggle_wishlist(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> WishlistToggle {
    match toggle_inner(state, session_token, product_id).await {
        Ok(in_wishlist) => WishlistToggle {
            success: true,
            in_wishlist,
            message: if in_wishlist {
                "Ditambahkan ke wishlist".to_string()
            } else {
                "Dihapus dari wishlist".to_string()
            },
        },
        Err(e) => WishlistToggle {
            success: false,
            in_wishlist: false,
            message: e.to_string(),
        },
    }
}

async fn toggle_inner(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> Result<bool, AppError> {
    if is_in_wishlist(state, session_token, product_id).await? {
        remove_from_wishlist(state, session_token, product_id).await?;
        Ok(false)
    } else {
        add_to_wishlist(state, session_token, product_id).await?;
        Ok(true)
    }
}

/// Isi wishlist user, urut sesuai kapan item ditambahkan.
pub async fn get_wishlist(
    state: &AppState,
    session_token: &str,
) -> Result<Vec<WishlistProduct>, AppError> {
    let session = guard::validate_session(state, session_token)?;

    let items = sqlx::query_as::<_, WishlistProduct>(
        "
        SELECT wi.id as item_id, p.id as product_id, p.name, p.price, p.stock,
               p.image, c.name as category_name, wi.added_date
        FROM wishlist_items wi
        JOIN wishlists w ON wi.wishlist_id = w.id
        JOIN products p ON wi.product_id = p.id
        JOIN categories c ON p.category_id = c.id
        WHERE w.user_id = ?
        ORDER BY wi.added_date ASC, wi.id ASC
        ",
    )
    .bind(session.user_id)
    .fetch_all(&state.db)
    .await?;

    Ok(items)
}
