use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config;
use crate::errors::AppError;

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_MANAGER: &str = "Manager";
pub const ROLE_CLIENT: &str = "Client";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub roles: Vec<String>, // "Admin" | "Manager" | "Client"
    pub login_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Staf back-office: Admin atau Manager.
    pub fn is_staff(&self) -> bool {
        self.has_role(ROLE_ADMIN) || self.has_role(ROLE_MANAGER)
    }
}

pub struct SessionStore {
    sessions: HashMap<String, SessionData>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Membuat sesi baru dan mengembalikan session token (UUID v4).
    pub fn create(
        &mut self,
        user_id: i64,
        username: String,
        name: String,
        roles: Vec<String>,
    ) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let timeout_mins = config::get_config().security.session_timeout_mins as i64;
        self.sessions.insert(
            token.clone(),
            SessionData {
                user_id,
                username,
                name,
                roles,
                login_at: now,
                expires_at: now + Duration::minutes(timeout_mins),
            },
        );
        token
    }

    /// Validasi session token: cek ada dan belum expired.
    pub fn validate(&self, token: &str) -> Result<&SessionData, AppError> {
        match self.sessions.get(token) {
            None => Err(AppError::Auth("Sesi tidak valid, silakan login ulang".into())),
            Some(s) if Utc::now() > s.expires_at => {
                Err(AppError::Auth("Sesi expired, silakan login ulang".into()))
            }
            Some(s) => Ok(s),
        }
    }

    /// Validasi session token + pastikan role Admin.
    pub fn validate_admin(&self, token: &str) -> Result<&SessionData, AppError> {
        let s = self.validate(token)?;
        if !s.is_admin() {
            return Err(AppError::Forbidden(
                "hanya Admin yang bisa melakukan ini".into(),
            ));
        }
        Ok(s)
    }

    /// Validasi session token + pastikan role Admin atau Manager.
    pub fn validate_staff(&self, token: &str) -> Result<&SessionData, AppError> {
        let s = self.validate(token)?;
        if !s.is_staff() {
            return Err(AppError::Forbidden(
                "hanya Admin atau Manager yang bisa melakukan ini".into(),
            ));
        }
        Ok(s)
    }

    /// Hapus sesi (logout).
    pub fn destroy(&mut self, token: &str) {
        self.sessions.remove(token);
    }
}
