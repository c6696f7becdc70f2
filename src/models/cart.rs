use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Satu baris keranjang. Nama dan harga adalah snapshot saat produk
/// dimasukkan, jadi tampilan keranjang tidak berubah saat katalog diedit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
}

/// Keranjang milik satu sesi. Urutan baris mengikuti urutan produk
/// pertama kali dimasukkan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Tambah produk; kalau barisnya sudah ada, quantity digabung.
    pub fn add(&mut self, product_id: i64, name: &str, price: f64, quantity: i64) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity += quantity;
        } else {
            self.lines.push(CartLine {
                product_id,
                name: name.to_string(),
                price,
                quantity,
            });
        }
    }

    /// Hapus baris produk; no-op kalau tidak ada.
    pub fn remove(&mut self, product_id: i64) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Set quantity sebuah baris; quantity <= 0 menghapus barisnya.
    pub fn set_quantity(&mut self, product_id: i64, quantity: i64) {
        if quantity <= 0 {
            self.remove(product_id);
            return;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    /// Total item: jumlah quantity semua baris.
    pub fn count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Subtotal harga seluruh baris.
    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(|l| l.price * l.quantity as f64).sum()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Penyimpanan keranjang per sesi. Tiap session token punya keranjang
/// sendiri; tidak ada keranjang yang dibagi antar sesi.
#[derive(Debug, Default)]
pub struct CartStore {
    carts: HashMap<String, Cart>,
}

impl CartStore {
    pub fn new() -> Self {
        Self {
            carts: HashMap::new(),
        }
    }

    /// Keranjang milik token, dibuat kalau belum ada.
    pub fn cart_mut(&mut self, token: &str) -> &mut Cart {
        self.carts.entry(token.to_string()).or_default()
    }

    /// Snapshot keranjang milik token (kosong kalau belum ada).
    pub fn cart(&self, token: &str) -> Cart {
        self.carts.get(token).cloned().unwrap_or_default()
    }

    /// Buang keranjang sesi (dipanggil saat logout).
    pub fn drop_cart(&mut self, token: &str) {
        self.carts.remove(token);
    }
}

/// Isi keranjang untuk presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total_items: i64,
    pub subtotal: f64,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total_items: cart.count(),
            subtotal: cart.subtotal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_merges_quantity() {
        let mut cart = Cart::new();
        cart.add(1, "Kaos Polos", 50_000.0, 2);
        cart.add(1, "Kaos Polos", 50_000.0, 3);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.count(), 5);
    }

    #[test]
    fn test_count_sums_across_lines() {
        let mut cart = Cart::new();
        cart.add(1, "Kaos Polos", 50_000.0, 2);
        cart.add(2, "Celana Jeans", 150_000.0, 1);

        assert_eq!(cart.count(), 3);
        assert_eq!(cart.subtotal(), 250_000.0);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(1, "Kaos Polos", 50_000.0, 2);
        cart.set_quantity(1, 0);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_replaces_not_merges() {
        let mut cart = Cart::new();
        cart.add(1, "Kaos Polos", 50_000.0, 2);
        cart.set_quantity(1, 7);

        assert_eq!(cart.lines()[0].quantity, 7);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = Cart::new();
        cart.add(1, "Kaos Polos", 50_000.0, 2);
        cart.remove(99);

        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = Cart::new();
        cart.add(3, "Topi", 25_000.0, 1);
        cart.add(1, "Kaos Polos", 50_000.0, 1);
        cart.add(2, "Celana Jeans", 150_000.0, 1);

        let ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_store_isolates_sessions() {
        let mut store = CartStore::new();
        store.cart_mut("sesi-a").add(1, "Kaos Polos", 50_000.0, 2);
        store.cart_mut("sesi-b").add(2, "Topi", 25_000.0, 1);

        assert_eq!(store.cart("sesi-a").count(), 2);
        assert_eq!(store.cart("sesi-b").count(), 1);
        assert_eq!(store.cart("sesi-c").count(), 0);
    }

    #[test]
    fn test_drop_cart() {
        let mut store = CartStore::new();
        store.cart_mut("sesi-a").add(1, "Kaos Polos", 50_000.0, 2);
        store.drop_cart("sesi-a");

        assert!(store.cart("sesi-a").is_empty());
    }
}
