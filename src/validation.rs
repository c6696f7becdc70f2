//! Input validation and sanitization module
//!
//! This module provides centralized input validation for:
//! - User input (names, usernames, passwords)
//! - Catalog data (product names, prices, stock)
//! - Cart quantities
//!
//! Individual validators return a single message; the `*_fields` helpers
//! collect one message per form field so the presentation layer can show
//! all problems at once.

use crate::config;
use crate::errors::FieldError;

/// Validation result type
pub type ValidationResult = Result<(), String>;

/// Validate a username
/// - Length: 3-50 characters
/// - Allowed: alphanumeric, underscore, hyphen
/// - Must start with letter
pub fn validate_username(username: &str) -> ValidationResult {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err("Username tidak boleh kosong".into());
    }

    if trimmed.len() < 3 || trimmed.len() > 50 {
        return Err("Username harus 3-50 karakter".into());
    }

    if !trimmed.chars().next().is_some_and(|c| c.is_alphabetic()) {
        return Err("Username harus dimulai dengan huruf".into());
    }

    if !trimmed.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Username hanya boleh berisi huruf, angka, underscore, dan hyphen".into());
    }

    Ok(())
}

/// Validate a full name
/// - Length: 2-100 characters
/// - Allowed: letters, spaces, basic punctuation
pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Nama tidak boleh kosong".into());
    }

    if trimmed.len() < 2 || trimmed.len() > 100 {
        return Err("Nama harus 2-100 karakter".into());
    }

    // Allow letters, spaces, and basic punctuation
    if !trimmed.chars().all(|c| c.is_alphabetic() || c.is_whitespace() || ".-'".contains(c)) {
        return Err("Nama hanya boleh berisi huruf, spasi, dan karakter .-'".into());
    }

    Ok(())
}

/// Validate password strength
/// - Minimum length from configuration (default 8)
/// - Must contain: uppercase, lowercase, number
pub fn validate_password(password: &str) -> ValidationResult {
    let min_length = config::get_config().security.min_password_length;

    if password.is_empty() {
        return Err("Password tidak boleh kosong".into());
    }

    if password.len() < min_length {
        return Err(format!("Password minimal {} karakter", min_length));
    }

    if password.len() > 128 {
        return Err("Password maksimal 128 karakter".into());
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_upper || !has_lower || !has_digit {
        return Err("Password harus mengandung huruf kapital, huruf kecil, dan angka".into());
    }

    Ok(())
}

/// Validate product name
/// - Length: 5-50 characters
pub fn validate_product_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Nama produk tidak boleh kosong".into());
    }

    if trimmed.len() < 5 || trimmed.len() > 50 {
        return Err("Nama produk harus 5-50 karakter".into());
    }

    Ok(())
}

/// Validate product price
/// - Must be finite and non-negative
pub fn validate_price(price: f64) -> ValidationResult {
    if price.is_nan() || price.is_infinite() {
        return Err("Harga tidak valid".into());
    }

    if price < 0.0 {
        return Err("Harga tidak boleh negatif".into());
    }

    if price > 1_000_000_000.0 {
        return Err("Harga maksimal 1 miliar".into());
    }

    Ok(())
}

/// Validate product stock
/// - Must be non-negative
pub fn validate_stock(stock: i64) -> ValidationResult {
    if stock < 0 {
        return Err("Stok tidak boleh negatif".into());
    }

    if stock > 1_000_000 {
        return Err("Stok maksimal 1.000.000".into());
    }

    Ok(())
}

/// Validate category name
pub fn validate_category_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Nama kategori tidak boleh kosong".into());
    }

    if trimmed.len() > 50 {
        return Err("Nama kategori maksimal 50 karakter".into());
    }

    Ok(())
}

/// Validate role name
pub fn validate_role_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Nama role tidak boleh kosong".into());
    }

    if trimmed.len() < 2 || trimmed.len() > 50 {
        return Err("Nama role harus 2-50 karakter".into());
    }

    Ok(())
}

/// Validate cart quantity
pub fn validate_quantity(qty: i64) -> ValidationResult {
    if qty < 1 {
        return Err("Jumlah minimal 1".into());
    }

    if qty > 1_000_000 {
        return Err("Jumlah maksimal 1.000.000".into());
    }

    Ok(())
}

/// Sanitize string input (remove potentially dangerous characters)
pub fn sanitize_string(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).collect()
}

/// Collect validation errors for product create/update forms
pub fn validate_product_fields(name: &str, price: f64, stock: i64) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_product_name(name) {
        errors.push(FieldError::new("name", msg));
    }

    if let Err(msg) = validate_price(price) {
        errors.push(FieldError::new("price", msg));
    }

    if let Err(msg) = validate_stock(stock) {
        errors.push(FieldError::new("stock", msg));
    }

    errors
}

/// Collect validation errors for the registration / create-user form
pub fn validate_user_fields(name: &str, username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_name(name) {
        errors.push(FieldError::new("name", msg));
    }

    if let Err(msg) = validate_username(username) {
        errors.push(FieldError::new("username", msg));
    }

    if let Err(msg) = validate_password(password) {
        errors.push(FieldError::new("password", msg));
    }

    errors
}
