use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::{Role, RoleSet};

/// A user row. `roles` is a comma-separated list of canonical role names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_names(self.roles.split(','))
    }
}

/// Canonical storage form of a role list.
pub fn encode_roles(roles: &RoleSet) -> String {
    roles.names().join(",")
}

/// Authenticated user info (safe to send to client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub primary_role: Role,
    pub hierarchy: i32,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        let set = u.role_set();
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            display_name: u.display_name,
            roles: set.roles().to_vec(),
            primary_role: set.primary(),
            hierarchy: set.hierarchy(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct LoginRequest {
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub password: String,
}

/// Register request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct RegisterRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 3, message = "Username must be at least 3 characters"))
    )]
    pub username: String,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub email: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 8, message = "Password must be at least 8 characters"))
    )]
    pub password: String,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Display name is required"))
    )]
    pub display_name: String,
}

/// Issued access token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Replace a user's roles. Names are normalized; unknown names are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetRolesRequest {
    pub roles: Vec<String>,
}
