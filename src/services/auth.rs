use chrono::Utc;
use sqlx::SqlitePool;

use crate::auth::guard;
use crate::auth::session::{ROLE_ADMIN, ROLE_CLIENT};
use crate::errors::{AppError, FieldError};
use crate::models::user::{AuthUserData, DbUser, LoginResult, RegisterPayload, User};
use crate::rate_limiter::LOGIN_LIMIT;
use crate::services::activity::log_activity;
use crate::validation;
use crate::AppState;

/// True kalau belum ada satu pun user dengan role Admin.
/// Dipakai UI untuk menampilkan layar setup admin pertama.
pub async fn check_first_run(state: &AppState) -> Result<bool, AppError> {
    let (admins,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*)
         FROM user_roles ur
         JOIN roles r ON ur.role_id = r.id
         WHERE r.name = ?",
    )
    .bind(ROLE_ADMIN)
    .fetch_one(&state.db)
    .await?;

    Ok(admins == 0)
}

/// Setup admin pertama. Hanya jalan selama belum ada Admin sama sekali.
pub async fn create_admin(state: &AppState, payload: RegisterPayload) -> Result<User, AppError> {
    if !check_first_run(state).await? {
        return Err(AppError::Forbidden("akun Admin sudah ada".into()));
    }

    let errors = validation::validate_user_fields(
        &payload.name,
        &payload.username,
        &payload.password,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = insert_user(&state.db, &payload).await?;
    attach_role(&state.db, user.id, ROLE_ADMIN).await?;

    log_activity(
        &state.db,
        Some(user.id),
        "CREATE_ADMIN",
        &format!("Setup admin pertama: {}", user.username),
        None,
    )
    .await;

    Ok(User::from(user))
}

/// Registrasi akun pelanggan. Akun baru otomatis dapat role Client.
pub async fn register(state: &AppState, payload: RegisterPayload) -> Result<User, AppError> {
    let errors = validation::validate_user_fields(
        &payload.name,
        &payload.username,
        &payload.password,
    );
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = insert_user(&state.db, &payload).await?;
    attach_role(&state.db, user.id, ROLE_CLIENT).await?;

    log_activity(
        &state.db,
        Some(user.id),
        "REGISTER",
        &format!("Registrasi akun baru: {}", user.username),
        None,
    )
    .await;

    Ok(User::from(user))
}

async fn insert_user(db: &SqlitePool, payload: &RegisterPayload) -> Result<DbUser, AppError> {
    let hash = bcrypt::hash(&payload.password, 12).map_err(|e| AppError::Internal(e.to_string()))?;

    let result = sqlx::query("INSERT INTO users (name, username, password_hash) VALUES (?, ?, ?)")
        .bind(payload.name.trim())
        .bind(payload.username.trim())
        .bind(&hash)
        .execute(db)
        .await;

    match result {
        Ok(res) => {
            let user = sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE id = ?")
                .bind(res.last_insert_rowid())
                .fetch_one(db)
                .await?;
            Ok(user)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::Validation(vec![FieldError::new(
                "username",
                "Username sudah digunakan",
            )]))
        }
        Err(e) => Err(e.into()),
    }
}

async fn attach_role(db: &SqlitePool, user_id: i64, role: &str) -> Result<(), AppError> {
    sqlx::query(
        "INSERT OR IGNORE INTO user_roles (user_id, role_id)
         SELECT ?, id FROM roles WHERE name = ?",
    )
    .bind(user_id)
    .bind(role)
    .execute(db)
    .await?;

    Ok(())
}

/// Login username + password. Percobaan dibatasi per username;
/// counter di-reset saat login sukses.
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<LoginResult, AppError> {
    let username = username.trim();
    LOGIN_LIMIT.check(username)?;

    let user: Option<DbUser> =
        sqlx::query_as::<_, DbUser>("SELECT * FROM users WHERE username = ? AND is_active = 1")
            .bind(username)
            .fetch_optional(&state.db)
            .await?;

    // Pesan error sama untuk user tidak ada / password salah
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Auth("Username atau password salah".into())),
    };

    if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
        return Err(AppError::Auth("Username atau password salah".into()));
    }

    let role_rows: Vec<(String,)> = sqlx::query_as(
        "SELECT r.name
         FROM roles r
         JOIN user_roles ur ON r.id = ur.role_id
         WHERE ur.user_id = ?",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    let roles: Vec<String> = role_rows.into_iter().map(|(name,)| name).collect();

    // Best-effort, login tidak boleh gagal hanya karena update ini
    let _ = sqlx::query("UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(user.id)
        .execute(&state.db)
        .await;

    LOGIN_LIMIT.reset(username);

    let session_token = state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .create(user.id, user.username.clone(), user.name.clone(), roles.clone());

    log_activity(
        &state.db,
        Some(user.id),
        "LOGIN",
        &format!("User login: {}", user.username),
        None,
    )
    .await;

    Ok(LoginResult {
        user: AuthUserData {
            id: user.id,
            name: user.name,
            username: user.username,
            roles,
        },
        session_token,
        login_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Logout: sesi dihapus dan keranjang sesi ikut dibuang.
pub async fn logout(state: &AppState, session_token: &str) -> Result<(), AppError> {
    let session = guard::validate_session(state, session_token)?;

    state
        .sessions
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .destroy(session_token);
    state
        .carts
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?
        .drop_cart(session_token);

    log_activity(
        &state.db,
        Some(session.user_id),
        "LOGOUT",
        &format!("User logout: {}", session.username),
        None,
    )
    .await;

    Ok(())
}

/// Probe sesi untuk presentation layer.
pub async fn check_session(
    state: &AppState,
    session_token: &str,
) -> Result<AuthUserData, AppError> {
    let session = guard::validate_session(state, session_token)?;

    Ok(AuthUserData {
        id: session.user_id,
        name: session.name,
        username: session.username,
        roles: session.roles,
    })
}
