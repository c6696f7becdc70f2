use crate::errors::AppError;
use crate::models::activity::ActivityLogWithUser;
use crate::AppState;

/// Ambil log aktivitas terbaru (Admin only)
pub async fn get_activity_logs(
    state: &AppState,
    session_token: &str,
    limit: i64,
) -> Result<Vec<ActivityLogWithUser>, AppError> {
    crate::auth::guard::validate_admin(state, session_token)?;

    let logs = sqlx::query_as::<_, ActivityLogWithUser>(
        r#"
        SELECT al.*, u.name as user_name
        FROM activity_logs al
        LEFT JOIN users u ON al.user_id = u.id
        ORDER BY al.created_at DESC, al.id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(&state.db)
    .await?;

    Ok(logs)
}

/// Helper internal untuk mencatat aktivitas.
/// Kegagalan insert tidak boleh menggagalkan operasi pemanggil.
pub async fn log_activity(
    db: &sqlx::SqlitePool,
    user_id: Option<i64>,
    action: &str,
    description: &str,
    metadata: Option<&str>,
) {
    let description = crate::validation::sanitize_string(description);
    let _ = sqlx::query(
        "INSERT INTO activity_logs (user_id, action, description, metadata) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(&description)
    .bind(metadata)
    .execute(db)
    .await;
}
