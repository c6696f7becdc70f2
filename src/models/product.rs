use serde::{Deserialize, Serialize};

use super::category::Category;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub image: Option<String>,
    pub is_in_wishlist: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Product dengan nama kategori (JOIN result).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductWithCategory {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub image: Option<String>,
    pub is_in_wishlist: bool,
}

/// Satu halaman listing produk. Page size tetap 4 item per halaman.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<ProductWithCategory>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Data halaman depan toko: kategori unggulan + produk terbaru.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomePage {
    pub categories: Vec<Category>,
    pub products: Vec<ProductWithCategory>,
}

/// Payload form produk (create dan update memakai field yang sama;
/// gambar dikirim terpisah sebagai ImageUpload).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub category_id: i64,
}

/// File gambar yang diterima dari presentation layer.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
