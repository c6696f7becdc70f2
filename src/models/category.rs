use serde::{Deserialize, Serialize};

use super::product::Product;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Category dengan jumlah produk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithCount {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
}

/// Detail kategori beserta produk-produknya.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryDetail {
    pub category: Category,
    pub products: Vec<Product>,
}
