use crate::auth::guard;
use crate::errors::AppError;
use crate::models::cart::{Cart, CartView};
use crate::validation;
use crate::AppState;

// Keranjang hidup di memori per session token, bukan di database.
// Semua operasi butuh sesi login yang valid; data produk diambil dulu
// sebelum lock keranjang supaya lock tidak dipegang melewati await.

/// Masukkan produk ke keranjang sesi. Nama dan harga di-snapshot dari
/// katalog saat ini; baris yang sudah ada digabung quantity-nya.
pub async fn add_to_cart(
    state: &AppState,
    session_token: &str,
    product_id: i64,
    quantity: i64,
) -> Result<CartView, AppError> {
    guard::validate_session(state, session_token)?;

    if let Err(msg) = validation::validate_quantity(quantity) {
        return Err(AppError::invalid("quantity", msg));
    }

    let product: Option<(String, f64)> =
        sqlx::query_as("SELECT name, price FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&state.db)
            .await?;
    let (name, price) =
        product.ok_or_else(|| AppError::NotFound("Produk tidak ditemukan".into()))?;

    let mut carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let cart = carts.cart_mut(session_token);
    cart.add(product_id, &name, price, quantity);

    Ok(CartView::from(&*cart))
}

/// Buang satu baris produk dari keranjang; no-op kalau tidak ada.
pub async fn remove_from_cart(
    state: &AppState,
    session_token: &str,
    product_id: i64,
) -> Result<CartView, AppError> {
    guard::validate_session(state, session_token)?;

    let mut carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let cart = carts.cart_mut(session_token);
    cart.remove(product_id);

    Ok(CartView::from(&*cart))
}

/// Set quantity sebuah baris; quantity <= 0 menghapus barisnya.
pub async fn update_quantity(
    state: &AppState,
    session_token: &str,
    product_id: i64,
    quantity: i64,
) -> Result<CartView, AppError> {
    guard::validate_session(state, session_token)?;

    let mut carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let cart = carts.cart_mut(session_token);
    cart.set_quantity(product_id, quantity);

    Ok(CartView::from(&*cart))
}

/// Isi keranjang sesi saat ini.
pub async fn get_cart(state: &AppState, session_token: &str) -> Result<CartView, AppError> {
    guard::validate_session(state, session_token)?;

    let carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let cart = carts.cart(session_token);

    Ok(CartView::from(&cart))
}

/// Jumlah item di keranjang, untuk badge di header.
pub async fn cart_count(state: &AppState, session_token: &str) -> Result<i64, AppError> {
    guard::validate_session(state, session_token)?;

    let carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(carts.cart(session_token).count())
}

/// Kosongkan keranjang sesi.
pub async fn clear_cart(state: &AppState, session_token: &str) -> Result<CartView, AppError> {
    guard::validate_session(state, session_token)?;

    let mut carts = state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    carts.drop_cart(session_token);

    Ok(CartView::from(&Cart::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil;

    async fn seed_product(state: &AppState, name: &str, price: f64) -> i64 {
        sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES ('Pakaian')")
            .execute(&state.db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO products (name, price, stock, category_id)
             VALUES (?, ?, 10, (SELECT id FROM categories WHERE name = 'Pakaian'))",
        )
        .bind(name)
        .bind(price)
        .execute(&state.db)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_add_snapshots_name_and_price() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);
        let id = seed_product(&state, "Kaos Polos", 50_000.0).await;

        let view = add_to_cart(&state, &token, id, 2).await.unwrap();
        assert_eq!(view.total_items, 2);
        assert_eq!(view.subtotal, 100_000.0);
        assert_eq!(view.lines[0].name, "Kaos Polos");

        // Harga katalog berubah, isi keranjang tidak ikut
        sqlx::query("UPDATE products SET price = 99000 WHERE id = ?")
            .bind(id)
            .execute(&state.db)
            .await
            .unwrap();
        let view = get_cart(&state, &token).await.unwrap();
        assert_eq!(view.lines[0].price, 50_000.0);
    }

    #[tokio::test]
    async fn test_add_requires_valid_session() {
        let state = testutil::state().await;
        let err = add_to_cart(&state, "token-ngawur", 1, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);

        let err = add_to_cart(&state, &token, 99, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_rejects_zero_quantity() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);
        let id = seed_product(&state, "Kaos Polos", 50_000.0).await;

        let err = add_to_cart(&state, &token, id, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_quantity_zero_removes_line() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);
        let id = seed_product(&state, "Kaos Polos", 50_000.0).await;

        add_to_cart(&state, &token, id, 2).await.unwrap();
        let view = update_quantity(&state, &token, id, 0).await.unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(view.total_items, 0);
    }

    #[tokio::test]
    async fn test_carts_are_isolated_per_session() {
        let state = testutil::state().await;
        let token_a = testutil::client_token(&state);
        let token_b = testutil::client_token(&state);
        let id = seed_product(&state, "Kaos Polos", 50_000.0).await;

        add_to_cart(&state, &token_a, id, 3).await.unwrap();

        assert_eq!(cart_count(&state, &token_a).await.unwrap(), 3);
        assert_eq!(cart_count(&state, &token_b).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);
        let id = seed_product(&state, "Kaos Polos", 50_000.0).await;

        add_to_cart(&state, &token, id, 2).await.unwrap();
        let view = clear_cart(&state, &token).await.unwrap();
        assert!(view.lines.is_empty());
        assert_eq!(cart_count(&state, &token).await.unwrap(), 0);
    }
}
