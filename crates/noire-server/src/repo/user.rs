use chrono::Utc;
use noire_types::{AppError, User};
use sqlx::{Pool, Sqlite};

use crate::error_convert::SqlxErrorExt;

const USER_COLUMNS: &str = "id, username, email, display_name, password_hash, roles, created_at";

/// Insert a new user.
pub async fn create(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    display_name: &str,
    password_hash: &str,
    roles: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, display_name, password_hash, roles, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    ))
    .bind(username)
    .bind(email.to_lowercase())
    .bind(display_name)
    .bind(password_hash)
    .bind(roles)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Emails are stored lowercased; lookups are case-insensitive.
pub async fn find_by_email(pool: &Pool<Sqlite>, email: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<User>, AppError> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Replace a user's stored role list. `None` when the user does not exist.
pub async fn set_roles(
    pool: &Pool<Sqlite>,
    id: i64,
    roles: &str,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET roles = ? WHERE id = ? RETURNING {USER_COLUMNS}"
    ))
    .bind(roles)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
