use serde::{Deserialize, Serialize};

/// Log aktivitas dengan nama pelakunya (JOIN result).
/// user_name None artinya aksi anonim atau user-nya sudah dihapus.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLogWithUser {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub action: String,
    pub description: String,
    pub metadata: Option<String>,
    pub created_at: Option<String>,
}
