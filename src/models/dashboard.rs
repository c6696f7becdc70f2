use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Laporan dashboard admin. Semua angka dihitung dalam satu kali
/// agregasi dari snapshot data yang sama.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub total_products: i64,
    pub total_categories: i64,
    pub total_users: i64,
    pub total_orders: i64,
    pub total_revenue: f64,
    pub monthly_revenue: f64,
    pub average_order_value: f64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
    pub sales_data: Vec<SalesPoint>,
    pub category_distribution: Vec<CategorySlice>,
    pub top_products: Vec<TopProduct>,
    pub monthly_growth: Vec<GrowthPoint>,
    pub user_roles: HashMap<String, i64>,
}

/// Penjualan satu hari kalender (date format "YYYY-MM-DD").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPoint {
    pub date: String,
    pub amount: f64,
}

/// Distribusi produk per kategori.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySlice {
    pub category_name: String,
    pub product_count: i64,
    pub total_value: f64,
}

/// Produk terlaris berdasarkan order item. Saat belum ada order item
/// sama sekali, daftar diisi produk katalog di-ranking price*stock:
/// sales berisi stock dan revenue berisi price*stock (angka potensi,
/// bukan penjualan nyata).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub name: String,
    pub sales: i64,
    pub revenue: f64,
}

/// Pertumbuhan revenue bulanan. Label bulan memakai format "%b %Y",
/// misalnya "Aug 2026".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub month: String,
    pub revenue: f64,
    pub growth: f64,
}
