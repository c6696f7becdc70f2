use super::session::SessionData;
use crate::errors::AppError;
use crate::AppState;

/// Helper: validasi session dari AppState dan kembalikan SessionData clone.
pub fn validate_session(state: &AppState, token: &str) -> Result<SessionData, AppError> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate(token).cloned()
}

/// Helper: validasi session + pastikan role Admin.
pub fn validate_admin(state: &AppState, token: &str) -> Result<SessionData, AppError> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate_admin(token).cloned()
}

/// Helper: validasi session + pastikan role Admin atau Manager.
pub fn validate_staff(state: &AppState, token: &str) -> Result<SessionData, AppError> {
    let store = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    store.validate_staff(token).cloned()
}
