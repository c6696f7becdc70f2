use serde::Serialize;
use thiserror::Error;

/// Pesan kesalahan untuk satu field form (dipakai presentation layer
/// untuk menampilkan error di sebelah input yang salah).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Autentikasi gagal: {0}")]
    Auth(String),

    #[error("Akses ditolak: {0}")]
    Forbidden(String),

    #[error("Data tidak ditemukan: {0}")]
    NotFound(String),

    #[error("Validasi gagal: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Error: {0}")]
    Internal(String),
}

impl AppError {
    /// Kesalahan validasi untuk satu field saja.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
