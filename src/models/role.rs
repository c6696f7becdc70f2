use serde::{Deserialize, Serialize};

/// Role dinamis. Admin, Manager, dan Client di-seed saat migrasi;
/// sisanya dibuat admin lewat halaman role management.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// Role beserta daftar username anggotanya.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDetail {
    pub role: Role,
    pub members: Vec<String>,
}

/// Baris form keanggotaan role: satu baris per user terdaftar.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoleMember {
    pub user_id: i64,
    pub username: String,
    pub selected: bool,
}

/// Perubahan keanggotaan yang dikirim balik dari form.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleMember {
    pub user_id: i64,
    pub selected: bool,
}
