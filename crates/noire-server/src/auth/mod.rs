pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod password;

use noire_types::{encode_roles, Role, RoleSet, User};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

/// Token signing settings, carried in `AppState`.
#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: Arc<str>,
    pub access_token_minutes: i64,
    /// Account promoted to administrator on login.
    pub admin_email: Option<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("admin_email", &self.admin_email)
            .finish()
    }
}

/// Check if the given email matches the configured admin email
/// (case-insensitive). Returns `false` when none is configured.
pub fn is_admin_email(settings: &AuthSettings, email: &str) -> bool {
    match settings.admin_email.as_deref() {
        Some(admin) if !admin.is_empty() => admin.eq_ignore_ascii_case(email),
        _ => false,
    }
}

/// If the user's email matches the admin email, add the administrator role.
/// Returns the (possibly updated) user. DB errors are non-fatal: the user
/// is returned unchanged on failure.
pub async fn maybe_promote_admin(db: &Pool<Sqlite>, settings: &AuthSettings, user: User) -> User {
    let current = user.role_set();
    if !is_admin_email(settings, &user.email) || current.has(Role::Administrator) {
        return user;
    }

    let mut names = current.names();
    names.push(Role::Administrator.as_str().to_string());
    let promoted = encode_roles(&RoleSet::from_names(names));

    match crate::repo::user::set_roles(db, user.id, &promoted).await {
        Ok(Some(updated)) => {
            tracing::info!(
                user_id = user.id,
                email = %user.email,
                "Auto-promoted user to administrator via ADMIN_EMAIL"
            );
            updated
        }
        Ok(None) => user,
        Err(e) => {
            tracing::error!(user_id = user.id, email = %user.email, error = %e, "Failed to auto-promote admin");
            user
        }
    }
}
