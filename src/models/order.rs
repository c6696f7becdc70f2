use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub order_date: Option<String>,
    pub total_amount: f64,
}

/// Item pesanan. product_name adalah snapshot saat pesanan dibuat,
/// bukan referensi ke produk katalog.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Detail lengkap satu pesanan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Payload membuat pesanan baru.
/// Backend menghitung total_amount sendiri dari item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderPayload {
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderItem {
    pub product_name: String,
    pub quantity: i64,
    pub price: f64,
}
