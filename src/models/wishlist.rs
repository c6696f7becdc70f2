use serde::{Deserialize, Serialize};

/// Item wishlist digabung data produk dan kategorinya (JOIN result).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WishlistProduct {
    pub item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub image: Option<String>,
    pub category_name: String,
    pub added_date: Option<String>,
}

/// Hasil toggle wishlist. Operasi ini tidak pernah mengembalikan error:
/// kegagalan apa pun dibungkus jadi success=false dengan message-nya.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistToggle {
    pub success: bool,
    pub in_wishlist: bool,
    pub message: String,
}
