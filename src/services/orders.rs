use crate::auth::guard;
use crate::errors::{AppError, FieldError};
use crate::models::order::{CreateOrderPayload, Order, OrderDetail, OrderItem};
use crate::services::activity::log_activity;
use crate::AppState;

/// Buat pesanan baru dari item yang dikirim client.
/// total_amount selalu dihitung ulang di sini, angka dari client diabaikan.
pub async fn create_order(
    state: &AppState,
    session_token: &str,
    payload: CreateOrderPayload,
) -> Result<OrderDetail, AppError> {
    let session = guard::validate_session(state, session_token)?;

    if payload.items.is_empty() {
        return Err(AppError::invalid("items", "Pesanan tidak boleh kosong"));
    }

    let mut errors: Vec<FieldError> = Vec::new();
    for (i, item) in payload.items.iter().enumerate() {
        if item.product_name.trim().is_empty() {
            errors.push(FieldError::new(
                &format!("items[{}].product_name", i),
                "Nama produk tidak boleh kosong",
            ));
        }
        if item.quantity < 1 {
            errors.push(FieldError::new(
                &format!("items[{}].quantity", i),
                "Quantity minimal 1",
            ));
        }
        if item.price < 0.0 || !item.price.is_finite() {
            errors.push(FieldError::new(
                &format!("items[{}].price", i),
                "Harga tidak valid",
            ));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let total_amount: f64 = payload
        .items
        .iter()
        .map(|item| item.price * item.quantity as f64)
        .sum();

    // Pesanan + item masuk dalam satu transaksi: tidak boleh ada
    // pesanan tanpa item karena gagal di tengah jalan
    let mut tx = state.db.begin().await?;

    let order_id = sqlx::query("INSERT INTO orders (total_amount) VALUES (?)")
        .bind(total_amount)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for item in &payload.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_name, quantity, price) VALUES (?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(item.product_name.trim())
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    log_activity(
        &state.db,
        Some(session.user_id),
        "CREATE_ORDER",
        &format!("Membuat pesanan #{} ({} item)", order_id, payload.items.len()),
        None,
    )
    .await;

    get_order_detail(state, order_id).await
}

/// Detail satu pesanan (staff only).
pub async fn get_order(
    state: &AppState,
    session_token: &str,
    id: i64,
) -> Result<OrderDetail, AppError> {
    guard::validate_staff(state, session_token)?;
    get_order_detail(state, id).await
}

async fn get_order_detail(state: &AppState, id: i64) -> Result<OrderDetail, AppError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Pesanan tidak ditemukan".into()))?;

    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT * FROM order_items WHERE order_id = ? ORDER BY id ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(OrderDetail { order, items })
}

/// Semua pesanan, terbaru dulu (staff only).
pub async fn list_orders(state: &AppState, session_token: &str) -> Result<Vec<Order>, AppError> {
    guard::validate_staff(state, session_token)?;

    let orders =
        sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY order_date DESC, id DESC")
            .fetch_all(&state.db)
            .await?;

    Ok(orders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::CreateOrderItem;
    use crate::services::testutil;

    fn payload(items: Vec<(&str, i64, f64)>) -> CreateOrderPayload {
        CreateOrderPayload {
            items: items
                .into_iter()
                .map(|(name, quantity, price)| CreateOrderItem {
                    product_name: name.to_string(),
                    quantity,
                    price,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_order_computes_total() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);

        let detail = create_order(
            &state,
            &token,
            payload(vec![("Kaos Polos", 2, 50_000.0), ("Topi Baseball", 1, 25_000.0)]),
        )
        .await
        .unwrap();

        assert_eq!(detail.order.total_amount, 125_000.0);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].product_name, "Kaos Polos");
        assert_eq!(detail.items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_create_order_rejects_empty_items() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);

        let err = create_order(&state, &token, payload(vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_order_collects_item_errors() {
        let state = testutil::state().await;
        let token = testutil::client_token(&state);

        let err = create_order(
            &state,
            &token,
            payload(vec![("", 0, -10.0), ("Topi Baseball", 1, 25_000.0)]),
        )
        .await
        .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 3);
                assert!(fields.iter().all(|f| f.field.starts_with("items[0]")));
            }
            other => panic!("harusnya Validation, dapat: {}", other),
        }
    }

    #[tokio::test]
    async fn test_get_order_requires_staff() {
        let state = testutil::state().await;
        let client = testutil::client_token(&state);
        let manager = testutil::manager_token(&state);

        let detail = create_order(&state, &client, payload(vec![("Kaos Polos", 1, 50_000.0)]))
            .await
            .unwrap();

        let err = get_order(&state, &client, detail.order.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let fetched = get_order(&state, &manager, detail.order.id).await.unwrap();
        assert_eq!(fetched.order.id, detail.order.id);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let state = testutil::state().await;
        let client = testutil::client_token(&state);
        let manager = testutil::manager_token(&state);

        let first = create_order(&state, &client, payload(vec![("Kaos Polos", 1, 50_000.0)]))
            .await
            .unwrap();
        let second = create_order(&state, &client, payload(vec![("Topi Baseball", 1, 25_000.0)]))
            .await
            .unwrap();

        let orders = list_orders(&state, &manager).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.order.id);
        assert_eq!(orders[1].id, first.order.id);
    }

    #[tokio::test]
    async fn test_get_order_not_found() {
        let state = testutil::state().await;
        let manager = testutil::manager_token(&state);

        let err = get_order(&state, &manager, 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
