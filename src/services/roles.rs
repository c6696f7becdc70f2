use sqlx::SqlitePool;

use crate::auth::guard;
use crate::errors::AppError;
use crate::models::role::{Role, RoleDetail, RoleMember, SetRoleMember};
use crate::services::activity::log_activity;
use crate::validation;
use crate::AppState;

// Manajemen role hanya untuk Admin. Role default (Admin/Manager/Client)
// di-seed oleh migrasi; di sini tidak ada perlakuan khusus untuk mereka.

pub async fn list_roles(state: &AppState, session_token: &str) -> Result<Vec<Role>, AppError> {
    guard::validate_admin(state, session_token)?;

    let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY id ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(roles)
}

pub async fn create_role(
    state: &AppState,
    session_token: &str,
    name: &str,
) -> Result<Role, AppError> {
    let session = guard::validate_admin(state, session_token)?;

    if let Err(msg) = validation::validate_role_name(name) {
        return Err(AppError::invalid("name", msg));
    }

    let trimmed = name.trim();
    let result = sqlx::query("INSERT INTO roles (name) VALUES (?)")
        .bind(trimmed)
        .execute(&state.db)
        .await;

    match result {
        Ok(res) => {
            log_activity(
                &state.db,
                Some(session.user_id),
                "CREATE_ROLE",
                &format!("Membuat role baru: {}", trimmed),
                None,
            )
            .await;

            Ok(Role {
                id: res.last_insert_rowid(),
                name: trimmed.to_string(),
            })
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::invalid("name", "Role sudah ada"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Detail role + daftar username anggotanya.
pub async fn get_role(
    state: &AppState,
    session_token: &str,
    id: i64,
) -> Result<RoleDetail, AppError> {
    guard::validate_admin(state, session_token)?;

    let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Role tidak ditemukan".into()))?;

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT u.username
         FROM users u
         JOIN user_roles ur ON ur.user_id = u.id
         WHERE ur.role_id = ?
         ORDER BY u.username ASC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(RoleDetail {
        role,
        members: rows.into_iter().map(|(username,)| username).collect(),
    })
}

pub async fn rename_role(
    state: &AppState,
    session_token: &str,
    id: i64,
    name: &str,
) -> Result<Role, AppError> {
    let session = guard::validate_admin(state, session_token)?;

    if let Err(msg) = validation::validate_role_name(name) {
        return Err(AppError::invalid("name", msg));
    }

    let trimmed = name.trim();
    let result = sqlx::query("UPDATE roles SET name = ? WHERE id = ?")
        .bind(trimmed)
        .bind(id)
        .execute(&state.db)
        .await;

    match result {
        Ok(res) if res.rows_affected() == 0 => {
            Err(AppError::NotFound("Role tidak ditemukan".into()))
        }
        Ok(_) => {
            log_activity(
                &state.db,
                Some(session.user_id),
                "UPDATE_ROLE",
                &format!("Mengganti nama role ID {}: {}", id, trimmed),
                None,
            )
            .await;

            Ok(Role {
                id,
                name: trimmed.to_string(),
            })
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::invalid("name", "Role sudah ada"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Hapus role; keanggotaannya ikut terhapus (CASCADE di user_roles).
pub async fn delete_role(
    state: &AppState,
    session_token: &str,
    id: i64,
) -> Result<(), AppError> {
    let session = guard::validate_admin(state, session_token)?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT name FROM roles WHERE id = ?")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    let name = match existing {
        Some((name,)) => name,
        None => return Err(AppError::NotFound("Role tidak ditemukan".into())),
    };

    sqlx::query("DELETE FROM roles WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    log_activity(
        &state.db,
        Some(session.user_id),
        "DELETE_ROLE",
        &format!("Menghapus role: {}", name),
        None,
    )
    .await;

    Ok(())
}

/// Semua user dengan penanda apakah mereka anggota role ini,
/// untuk layar edit keanggotaan.
pub async fn get_role_members(
    state: &AppState,
    session_token: &str,
    role_id: i64,
) -> Result<Vec<RoleMember>, AppError> {
    guard::validate_admin(state, session_token)?;

    let role: Option<(i64,)> = sqlx::query_as("SELECT id FROM roles WHERE id = ?")
        .bind(role_id)
        .fetch_optional(&state.db)
        .await?;
    if role.is_none() {
        return Err(AppError::NotFound("Role tidak ditemukan".into()));
    }

    let members = sqlx::query_as::<_, RoleMember>(
        "SELECT u.id as user_id, u.username, (ur.user_id IS NOT NULL) as selected
         FROM users u
         LEFT JOIN user_roles ur ON ur.user_id = u.id AND ur.role_id = ?
         ORDER BY u.username ASC",
    )
    .bind(role_id)
    .fetch_all(&state.db)
    .await?;

    Ok(members)
}

/// Terapkan pilihan keanggotaan dari layar edit: yang dicentang masuk,
/// yang tidak dicentang keluar. Idempoten.
pub async fn set_role_members(
    state: &AppState,
    session_token: &str,
    role_id: i64,
    members: Vec<SetRoleMember>,
) -> Result<(), AppError> {
    let session = guard::validate_admin(state, session_token)?;

    let role: Option<(String,)> = sqlx::query_as("SELECT name FROM roles WHERE id = ?")
        .bind(role_id)
        .fetch_optional(&state.db)
        .await?;
    let role_name = match role {
        Some((name,)) => name,
        None => return Err(AppError::NotFound("Role tidak ditemukan".into())),
    };

    for member in &members {
        if member.selected {
            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(member.user_id)
                .bind(role_id)
                .execute(&state.db)
                .await?;
        } else {
            sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = ?")
                .bind(member.user_id)
                .bind(role_id)
                .execute(&state.db)
                .await?;
        }
    }

    log_activity(
        &state.db,
        Some(session.user_id),
        "EDIT_ROLE_MEMBERS",
        &format!("Mengubah keanggotaan role: {}", role_name),
        None,
    )
    .await;

    Ok(())
}

/// Jumlah user per role, dipakai dashboard.
pub(crate) async fn user_role_counts(db: &SqlitePool) -> Result<Vec<(String, i64)>, AppError> {
    let counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT r.name, COUNT(ur.user_id)
         FROM roles r
         LEFT JOIN user_roles ur ON r.id = ur.role_id
         GROUP BY r.id, r.name",
    )
    .fetch_all(db)
    .await?;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil;

    async fn role_id(state: &AppState, name: &str) -> i64 {
        let (id,): (i64,) = sqlx::query_as("SELECT id FROM roles WHERE name = ?")
            .bind(name)
            .fetch_one(&state.db)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_default_roles_listed_for_admin() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);

        let roles = list_roles(&state, &token).await.unwrap();
        let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Admin", "Manager", "Client"]);
    }

    #[tokio::test]
    async fn test_manager_cannot_manage_roles() {
        let state = testutil::state().await;
        let token = testutil::manager_token(&state);

        let err = list_roles(&state, &token).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_role_duplicate_name() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);

        create_role(&state, &token, "Kurir").await.unwrap();
        let err = create_role(&state, &token, "Kurir").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rename_role_not_found() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);

        let err = rename_role(&state, &token, 99, "Kurir").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_role_lists_member_usernames() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);
        let admin_role = role_id(&state, "Admin").await;

        let detail = get_role(&state, &token, admin_role).await.unwrap();
        assert_eq!(detail.role.name, "Admin");
        assert_eq!(detail.members, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn test_role_members_selected_flags() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);
        let admin_role = role_id(&state, "Admin").await;

        let members = get_role_members(&state, &token, admin_role).await.unwrap();
        // Terurut username: admin, client, manager
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].username, "admin");
        assert!(members[0].selected);
        assert!(!members[1].selected);
        assert!(!members[2].selected);
    }

    #[tokio::test]
    async fn test_set_role_members_applies_selection() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);
        let manager_role = role_id(&state, "Manager").await;

        // User 3 masuk, user 2 keluar
        set_role_members(
            &state,
            &token,
            manager_role,
            vec![
                SetRoleMember {
                    user_id: 2,
                    selected: false,
                },
                SetRoleMember {
                    user_id: 3,
                    selected: true,
                },
            ],
        )
        .await
        .unwrap();

        let detail = get_role(&state, &token, manager_role).await.unwrap();
        assert_eq!(detail.members, vec!["client".to_string()]);
    }

    #[tokio::test]
    async fn test_set_role_members_is_idempotent() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);
        let manager_role = role_id(&state, "Manager").await;

        let selection = vec![SetRoleMember {
            user_id: 2,
            selected: true,
        }];
        set_role_members(&state, &token, manager_role, selection.clone())
            .await
            .unwrap();
        set_role_members(&state, &token, manager_role, selection)
            .await
            .unwrap();

        let detail = get_role(&state, &token, manager_role).await.unwrap();
        assert_eq!(detail.members.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_role_cascades_membership() {
        let state = testutil::state().await;
        let token = testutil::admin_token(&state);
        let client_role = role_id(&state, "Client").await;

        delete_role(&state, &token, client_role).await.unwrap();

        let (memberships,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_roles WHERE role_id = ?")
                .bind(client_role)
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(memberships, 0);
    }

    #[tokio::test]
    async fn test_user_role_counts() {
        let state = testutil::state().await;

        let counts = user_role_counts(&state.db).await.unwrap();
        for (name, expected) in [("Admin", 1), ("Manager", 1), ("Client", 1)] {
            let found = counts.iter().find(|(n, _)| n == name);
            assert_eq!(found.map(|(_, c)| *c), Some(expected), "role {}", name);
        }
    }
}
