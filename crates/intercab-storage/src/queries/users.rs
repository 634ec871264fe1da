// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User registry queries.

use chrono::Utc;
use intercab_core::types::{PlatformId, UserId};
use intercab_core::IntercabError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{user_from_row, Role, User, UserCounts, UserStatus, USER_SELECT};

/// Return the user for `platform_id`, creating a `pending` user with `role` if absent.
///
/// An existing user keeps its role and status; only the display names are refreshed.
pub async fn get_or_create_user(
    db: &Database,
    platform_id: PlatformId,
    username: Option<&str>,
    full_name: &str,
    role: Role,
) -> Result<User, IntercabError> {
    let username = username.map(str::to_string);
    let full_name = full_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (platform_id, username, full_name, role, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (platform_id) DO UPDATE
                 SET username = excluded.username, full_name = excluded.full_name",
                params![
                    platform_id,
                    username,
                    full_name,
                    role.to_string(),
                    UserStatus::Pending.to_string(),
                    Utc::now(),
                ],
            )?;
            conn.query_row(
                &format!("{USER_SELECT} WHERE platform_id = ?1"),
                params![platform_id],
                user_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by internal ID.
pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(&format!("{USER_SELECT} WHERE id = ?1"), params![id], user_from_row)
                .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by messaging platform ID.
pub async fn find_user_by_platform_id(
    db: &Database,
    platform_id: PlatformId,
) -> Result<Option<User>, IntercabError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{USER_SELECT} WHERE platform_id = ?1"),
                params![platform_id],
                user_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

async fn update_user_column(
    db: &Database,
    id: UserId,
    column: &'static str,
    value: String,
) -> Result<(), IntercabError> {
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                &format!("UPDATE users SET {column} = ?1 WHERE id = ?2"),
                params![value, id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(IntercabError::not_found("user", id));
    }
    Ok(())
}

pub async fn set_user_phone(db: &Database, id: UserId, phone: &str) -> Result<(), IntercabError> {
    update_user_column(db, id, "phone", phone.to_string()).await
}

pub async fn set_user_role(db: &Database, id: UserId, role: Role) -> Result<(), IntercabError> {
    update_user_column(db, id, "role", role.to_string()).await
}

pub async fn set_user_status(
    db: &Database,
    id: UserId,
    status: UserStatus,
) -> Result<(), IntercabError> {
    update_user_column(db, id, "status", status.to_string()).await
}

/// Users of `role`, optionally restricted to one status, oldest first.
pub async fn users_by_role(
    db: &Database,
    role: Role,
    status: Option<UserStatus>,
) -> Result<Vec<User>, IntercabError> {
    let role = role.to_string();
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{USER_SELECT} WHERE role = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![role, status], user_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Registered user counts by role.
pub async fn user_counts(db: &Database) -> Result<UserCounts, IntercabError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(role = 'rider'), 0),
                        COALESCE(SUM(role = 'driver'), 0),
                        COALESCE(SUM(role = 'operator'), 0)
                 FROM users",
                [],
                |row| {
                    Ok(UserCounts {
                        total: row.get(0)?,
                        riders: row.get(1)?,
                        drivers: row.get(2)?,
                        operators: row.get(3)?,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
