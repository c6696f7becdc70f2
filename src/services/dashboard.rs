use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};

use crate::auth::guard;
use crate::errors::AppError;
use crate::log_warn;
use crate::models::dashboard::{
    CategorySlice, DashboardReport, GrowthPoint, SalesPoint, TopProduct,
};
use crate::services::catalog::LOW_STOCK_THRESHOLD;
use crate::services::roles;
use crate::AppState;

/// Laporan dashboard admin: semua tabel dibaca sekali, lalu seluruh
/// angka dihitung di memori dari snapshot yang sama.
pub async fn get_dashboard(
    state: &AppState,
    session_token: &str,
) -> Result<DashboardReport, AppError> {
    guard::validate_admin(state, session_token)?;

    let order_rows: Vec<(Option<String>, f64)> =
        sqlx::query_as("SELECT order_date, total_amount FROM orders")
            .fetch_all(&state.db)
            .await?;

    let item_rows: Vec<(String, i64, f64)> =
        sqlx::query_as("SELECT product_name, quantity, price FROM order_items")
            .fetch_all(&state.db)
            .await?;

    let product_rows: Vec<(String, f64, i64, i64)> =
        sqlx::query_as("SELECT name, price, stock, category_id FROM products")
            .fetch_all(&state.db)
            .await?;

    let category_rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&state.db)
            .await?;

    let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;

    let role_counts = roles::user_role_counts(&state.db).await?;

    // Pesanan tanpa tanggal valid tetap dihitung di total,
    // hanya tidak muncul di deret waktu
    let orders: Vec<(Option<NaiveDateTime>, f64)> = order_rows
        .into_iter()
        .map(|(date, total)| (date.as_deref().and_then(parse_order_date), total))
        .collect();

    Ok(build_report(
        &orders,
        &item_rows,
        &product_rows,
        &category_rows,
        total_users,
        &role_counts,
        Utc::now().naive_utc(),
    ))
}

/// SQLite menyimpan CURRENT_TIMESTAMP sebagai "YYYY-MM-DD HH:MM:SS";
/// data impor kadang datang dalam RFC 3339.
fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc()));

    match parsed {
        Ok(date) => Some(date),
        Err(_) => {
            log_warn!(
                "DASHBOARD",
                &format!("Tanggal pesanan tidak bisa diparse: {}", raw)
            );
            None
        }
    }
}

// products: (name, price, stock, category_id)
// items: (product_name, quantity, price)
fn build_report(
    orders: &[(Option<NaiveDateTime>, f64)],
    items: &[(String, i64, f64)],
    products: &[(String, f64, i64, i64)],
    categories: &[(i64, String)],
    total_users: i64,
    role_counts: &[(String, i64)],
    now: NaiveDateTime,
) -> DashboardReport {
    let today = now.date();
    let dated: Vec<(NaiveDateTime, f64)> = orders
        .iter()
        .filter_map(|(date, total)| date.map(|d| (d, *total)))
        .collect();

    let total_orders = orders.len() as i64;
    let total_revenue: f64 = orders.iter().map(|(_, total)| total).sum();
    let average_order_value = if orders.is_empty() {
        0.0
    } else {
        total_revenue / total_orders as f64
    };

    let first_of_month = today.with_day(1).unwrap_or(today);
    let monthly_revenue: f64 = dated
        .iter()
        .filter(|(date, _)| date.date() >= first_of_month)
        .map(|(_, total)| total)
        .sum();

    let low_stock_products = products
        .iter()
        .filter(|(_, _, stock, _)| *stock > 0 && *stock < LOW_STOCK_THRESHOLD)
        .count() as i64;
    let out_of_stock_products = products.iter().filter(|(_, _, stock, _)| *stock == 0).count() as i64;

    DashboardReport {
        total_products: products.len() as i64,
        total_categories: categories.len() as i64,
        total_users,
        total_orders,
        total_revenue,
        monthly_revenue,
        average_order_value,
        low_stock_products,
        out_of_stock_products,
        sales_data: daily_sales(&dated, today),
        category_distribution: category_distribution(categories, products),
        top_products: top_products(items, products),
        monthly_growth: monthly_growth(&dated, today),
        user_roles: role_counts.iter().cloned().collect(),
    }
}

/// Penjualan harian 7 hari terakhir (termasuk hari ini), urut kronologis.
/// Hari tanpa penjualan tetap muncul dengan amount 0.
fn daily_sales(dated: &[(NaiveDateTime, f64)], today: NaiveDate) -> Vec<SalesPoint> {
    (0..7)
        .rev()
        .map(|i| {
            let day = today - Duration::days(i);
            let amount = dated
                .iter()
                .filter(|(date, _)| date.date() == day)
                .map(|(_, total)| total)
                .sum();

            SalesPoint {
                date: day.format("%Y-%m-%d").to_string(),
                amount,
            }
        })
        .collect()
}

/// Distribusi produk per kategori, urut mengikuti daftar kategori.
/// total_value = jumlah price*stock produk di kategori itu.
fn category_distribution(
    categories: &[(i64, String)],
    products: &[(String, f64, i64, i64)],
) -> Vec<CategorySlice> {
    categories
        .iter()
        .map(|(id, name)| {
            let mut product_count = 0i64;
            let mut total_value = 0.0f64;

            for (_, price, stock, category_id) in products {
                if category_id == id {
                    product_count += 1;
                    total_value += price * *stock as f64;
                }
            }

            CategorySlice {
                category_name: name.clone(),
                product_count,
                total_value,
            }
        })
        .collect()
}

/// Lima produk teratas berdasarkan revenue dari order item.
/// Tanpa order item sama sekali, fallback ke potensi katalog.
fn top_products(
    items: &[(String, i64, f64)],
    products: &[(String, f64, i64, i64)],
) -> Vec<TopProduct> {
    let mut tops: Vec<TopProduct>;

    if items.is_empty() {
        tops = products
            .iter()
            .map(|(name, price, stock, _)| TopProduct {
                name: name.clone(),
                sales: *stock,
                revenue: price * *stock as f64,
            })
            .collect();
    } else {
        let mut index: HashMap<&str, usize> = HashMap::new();
        tops = Vec::new();

        for (name, quantity, price) in items {
            match index.get(name.as_str()) {
                Some(&i) => {
                    tops[i].sales += quantity;
                    tops[i].revenue += price * *quantity as f64;
                }
                None => {
                    index.insert(name.as_str(), tops.len());
                    tops.push(TopProduct {
                        name: name.clone(),
                        sales: *quantity,
                        revenue: price * *quantity as f64,
                    });
                }
            }
        }
    }

    // sort_by stabil: revenue sama, yang lebih dulu muncul menang
    tops.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tops.truncate(5);
    tops
}

/// Revenue 6 bulan terakhir plus persentase pertumbuhan terhadap bulan
/// sebelumnya. Bulan pertama dan bulan setelah revenue 0 diberi growth 0.
fn monthly_growth(dated: &[(NaiveDateTime, f64)], today: NaiveDate) -> Vec<GrowthPoint> {
    let mut points: Vec<GrowthPoint> = Vec::with_capacity(6);

    for i in (0..6u32).rev() {
        let month = today.checked_sub_months(Months::new(i)).unwrap_or(today);
        let revenue: f64 = dated
            .iter()
            .filter(|(date, _)| date.year() == month.year() && date.month() == month.month())
            .map(|(_, total)| total)
            .sum();

        let growth = match points.last() {
            None => 0.0,
            Some(prev) if prev.revenue == 0.0 => 0.0,
            Some(prev) => round2((revenue - prev.revenue) / prev.revenue * 100.0),
        };

        points.push(GrowthPoint {
            month: month.format("%b %Y").to_string(),
            revenue,
            growth,
        });
    }

    points
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(12, 0, 0).unwrap()
    }

    fn order(date: NaiveDate, total: f64) -> (Option<NaiveDateTime>, f64) {
        (Some(at_noon(date)), total)
    }

    #[test]
    fn test_empty_report_is_all_zero() {
        let report = build_report(&[], &[], &[], &[], 0, &[], at_noon(day(2026, 8, 25)));

        assert_eq!(report.total_orders, 0);
        assert_eq!(report.total_revenue, 0.0);
        assert_eq!(report.average_order_value, 0.0);
        assert_eq!(report.monthly_revenue, 0.0);
        assert_eq!(report.sales_data.len(), 7);
        assert!(report.sales_data.iter().all(|p| p.amount == 0.0));
        assert!(report.top_products.is_empty());
    }

    #[test]
    fn test_daily_sales_window_boundaries() {
        let today = day(2026, 8, 25);
        let dated = vec![
            (at_noon(today), 100.0),
            (at_noon(day(2026, 8, 19)), 50.0),  // hari pertama window
            (at_noon(day(2026, 8, 18)), 999.0), // di luar window
            (at_noon(day(2026, 8, 26)), 999.0), // besok, di luar window
        ];

        let series = daily_sales(&dated, today);
        assert_eq!(series.len(), 7);
        // Kronologis: tertua dulu
        assert_eq!(series[0].date, "2026-08-19");
        assert_eq!(series[0].amount, 50.0);
        assert_eq!(series[6].date, "2026-08-25");
        assert_eq!(series[6].amount, 100.0);
        // Hari kosong tetap ada, amount 0
        assert_eq!(series[1].amount, 0.0);
    }

    #[test]
    fn test_daily_sales_sums_same_day() {
        let today = day(2026, 8, 25);
        let dated = vec![(at_noon(today), 100.0), (at_noon(today), 75.0)];

        let series = daily_sales(&dated, today);
        assert_eq!(series[6].amount, 175.0);
    }

    #[test]
    fn test_monthly_revenue_starts_at_first_of_month() {
        let now = at_noon(day(2026, 8, 25));
        let orders = vec![
            order(day(2026, 8, 1), 100.0),  // tanggal 1 ikut
            order(day(2026, 8, 25), 50.0),
            order(day(2026, 7, 31), 999.0), // bulan lalu tidak
        ];

        let report = build_report(&orders, &[], &[], &[], 0, &[], now);
        assert_eq!(report.monthly_revenue, 150.0);
        assert_eq!(report.total_revenue, 1149.0);
    }

    #[test]
    fn test_average_order_value() {
        let now = at_noon(day(2026, 8, 25));
        let orders = vec![order(day(2026, 8, 1), 100.0), order(day(2026, 8, 2), 50.0)];

        let report = build_report(&orders, &[], &[], &[], 0, &[], now);
        assert_eq!(report.average_order_value, 75.0);
    }

    #[test]
    fn test_undated_orders_count_in_totals_only() {
        let now = at_noon(day(2026, 8, 25));
        let orders = vec![order(day(2026, 8, 25), 100.0), (None, 40.0)];

        let report = build_report(&orders, &[], &[], &[], 0, &[], now);
        assert_eq!(report.total_orders, 2);
        assert_eq!(report.total_revenue, 140.0);
        // Deret harian hanya melihat yang bertanggal
        assert_eq!(report.sales_data[6].amount, 100.0);
    }

    #[test]
    fn test_monthly_growth_labels_and_rounding() {
        let today = day(2026, 8, 25);
        let dated = vec![
            (at_noon(day(2026, 7, 10)), 300.0),
            (at_noon(day(2026, 8, 5)), 400.0),
        ];

        let points = monthly_growth(&dated, today);
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].month, "Mar 2026");
        assert_eq!(points[5].month, "Aug 2026");

        // Bulan pertama selalu 0
        assert_eq!(points[0].growth, 0.0);
        // Juli naik dari 0: tetap 0, bukan tak hingga
        assert_eq!(points[4].revenue, 300.0);
        assert_eq!(points[4].growth, 0.0);
        // Agustus: (400-300)/300*100 = 33.33
        assert_eq!(points[5].revenue, 400.0);
        assert_eq!(points[5].growth, 33.33);
    }

    #[test]
    fn test_top_products_groups_and_ranks() {
        let items = vec![
            ("Kaos Polos".to_string(), 2, 50_000.0),
            ("Topi Baseball".to_string(), 1, 25_000.0),
            ("Kaos Polos".to_string(), 1, 50_000.0),
        ];
        let products = vec![("Tidak Dipakai".to_string(), 1.0, 1, 1)];

        let tops = top_products(&items, &products);
        assert_eq!(tops.len(), 2);
        assert_eq!(tops[0].name, "Kaos Polos");
        assert_eq!(tops[0].sales, 3);
        assert_eq!(tops[0].revenue, 150_000.0);
        assert_eq!(tops[1].name, "Topi Baseball");
    }

    #[test]
    fn test_top_products_caps_at_five() {
        let items: Vec<(String, i64, f64)> = (0..8)
            .map(|i| (format!("Produk {}", i), 1, 1000.0 * (i + 1) as f64))
            .collect();

        let tops = top_products(&items, &[]);
        assert_eq!(tops.len(), 5);
        assert_eq!(tops[0].name, "Produk 7");
    }

    #[test]
    fn test_top_products_fallback_only_when_no_items() {
        let products = vec![
            ("Kaos Polos".to_string(), 50_000.0, 10, 1),
            ("Topi Baseball".to_string(), 25_000.0, 4, 1),
        ];

        let tops = top_products(&[], &products);
        assert_eq!(tops[0].name, "Kaos Polos");
        assert_eq!(tops[0].sales, 10);
        assert_eq!(tops[0].revenue, 500_000.0);

        // Begitu ada satu item saja, fallback tidak dipakai
        let items = vec![("Topi Baseball".to_string(), 1, 25_000.0)];
        let tops = top_products(&items, &products);
        assert_eq!(tops.len(), 1);
        assert_eq!(tops[0].name, "Topi Baseball");
    }

    #[test]
    fn test_category_distribution_example() {
        let categories = vec![(1, "A".to_string()), (2, "B".to_string())];
        let products = vec![
            ("Produk A".to_string(), 10.0, 5, 1),
            ("Produk B".to_string(), 20.0, 0, 2),
        ];

        let slices = category_distribution(&categories, &products);
        assert_eq!(
            slices,
            vec![
                CategorySlice {
                    category_name: "A".to_string(),
                    product_count: 1,
                    total_value: 50.0,
                },
                CategorySlice {
                    category_name: "B".to_string(),
                    product_count: 1,
                    total_value: 0.0,
                },
            ]
        );

        let report = build_report(
            &[],
            &[],
            &products,
            &categories,
            0,
            &[],
            at_noon(day(2026, 8, 25)),
        );
        assert_eq!(report.out_of_stock_products, 1);
        assert_eq!(report.low_stock_products, 1); // stok 5 < 10
    }

    #[test]
    fn test_stock_counters() {
        let products = vec![
            ("Habis".to_string(), 10.0, 0, 1),
            ("Tipis".to_string(), 10.0, 9, 1),
            ("Aman".to_string(), 10.0, 10, 1),
        ];

        let report = build_report(
            &[],
            &[],
            &products,
            &[],
            0,
            &[],
            at_noon(day(2026, 8, 25)),
        );
        assert_eq!(report.out_of_stock_products, 1);
        assert_eq!(report.low_stock_products, 1);
        assert_eq!(report.total_products, 3);
    }

    #[tokio::test]
    async fn test_get_dashboard_end_to_end() {
        let state = testutil::state().await;
        let admin = testutil::admin_token(&state);
        let client = testutil::client_token(&state);

        // Dashboard hanya untuk Admin
        assert!(matches!(
            get_dashboard(&state, &client).await.unwrap_err(),
            AppError::Forbidden(_)
        ));

        sqlx::query("INSERT INTO categories (name) VALUES ('Pakaian')")
            .execute(&state.db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO products (name, price, stock, category_id)
             VALUES ('Kaos Polos', 50000, 10, 1)",
        )
        .execute(&state.db)
        .await
        .unwrap();

        crate::services::orders::create_order(
            &state,
            &client,
            crate::models::order::CreateOrderPayload {
                items: vec![crate::models::order::CreateOrderItem {
                    product_name: "Kaos Polos".to_string(),
                    quantity: 2,
                    price: 50_000.0,
                }],
            },
        )
        .await
        .unwrap();

        let report = get_dashboard(&state, &admin).await.unwrap();
        assert_eq!(report.total_products, 1);
        assert_eq!(report.total_categories, 1);
        assert_eq!(report.total_users, 3);
        assert_eq!(report.total_orders, 1);
        assert_eq!(report.total_revenue, 100_000.0);
        assert_eq!(report.monthly_revenue, 100_000.0);
        // Pesanan hari ini masuk titik terakhir deret harian
        assert_eq!(report.sales_data[6].amount, 100_000.0);
        assert_eq!(report.top_products[0].name, "Kaos Polos");
        assert_eq!(report.top_products[0].sales, 2);
        assert_eq!(report.user_roles.get("Client"), Some(&1));
    }
}
