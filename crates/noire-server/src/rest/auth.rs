use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Sqlite};

use noire_types::{
    encode_roles, hierarchy, AppError, LoginRequest, LoginResponse, RegisterRequest, Role, RoleSet,
    SetRolesRequest, UserResponse,
};

use crate::auth::extractors::{Actor, AuthRequired, RankRequired};
use crate::auth::{jwt, maybe_promote_admin, password, AuthSettings};
use crate::error_convert::ValidateRequest;
use crate::repo;

// ── Authentication ─────────────────────────────────────────────────

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 409, description = "Email or username already taken", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body), fields(email = %body.email))]
pub async fn register(
    State(pool): State<Pool<Sqlite>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    body.validate_request()?;

    let hash = password::hash_password(&body.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;

    let user = repo::user::create(
        &pool,
        body.username.trim(),
        body.email.trim(),
        body.display_name.trim(),
        &hash,
        Role::BaseUser.as_str(),
    )
    .await?;

    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = AppError)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, settings, body), fields(email = %body.email))]
pub async fn login(
    State(pool): State<Pool<Sqlite>>,
    State(settings): State<AuthSettings>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = repo::user::find_by_email(&pool, body.email.trim()).await?;

    let stored_hash = user.as_ref().map(|u| u.password_hash.as_str());
    if !password::check_login(&body.password, stored_hash) {
        return Err(AppError::unauthorized("Invalid email or password"));
    }
    let user = user.ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

    let user = maybe_promote_admin(&pool, &settings, user).await;
    let roles = user.role_set().names();

    let token = jwt::create_access_token(&settings, user.id, &user.email, &roles)
        .map_err(|e| AppError::internal(format!("Failed to issue token: {e}")))?;

    tracing::info!(user_id = user.id, "login succeeded");
    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: settings.access_token_minutes * 60,
        user: UserResponse::from(user),
    }))
}

/// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = AppError)
    ),
    tag = "auth"
)]
pub async fn me(
    State(pool): State<Pool<Sqlite>>,
    AuthRequired(claims): AuthRequired,
) -> Result<Json<UserResponse>, AppError> {
    let user = repo::user::find_by_id(&pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("This account no longer exists"))?;
    Ok(Json(UserResponse::from(user)))
}

// ── Users ──────────────────────────────────────────────────────────

/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Sergeant rank or above required", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_users(
    State(pool): State<Pool<Sqlite>>,
    RankRequired(actor): RankRequired<{ hierarchy::SERGEANT }>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    tracing::debug!(viewer = actor.id, "listing users");
    let users = repo::user::list(&pool).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Resolve requested role names, refusing any name that is not a known role.
fn parse_roles(names: &[String]) -> Result<RoleSet, AppError> {
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| Role::from_name(n).is_none())
        .collect();
    if !unknown.is_empty() {
        return Err(AppError::field(
            "roles",
            format!("Unknown role(s): {}", unknown.join(", ")),
        ));
    }
    Ok(RoleSet::from_names(names.iter().map(String::as_str)))
}

/// PUT /api/users/{id}/roles
#[utoipa::path(
    put,
    path = "/api/users/{id}/roles",
    request_body = SetRolesRequest,
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles replaced", body = UserResponse),
        (status = 403, description = "Administrators only", body = AppError),
        (status = 404, description = "User not found", body = AppError),
        (status = 422, description = "Unknown role", body = AppError)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool))]
pub async fn set_roles(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<SetRolesRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if !actor.is_admin() {
        return Err(AppError::forbidden("Only administrators can change roles")
            .with_code("forbidden"));
    }

    let roles = parse_roles(&body.roles)?;
    let user = repo::user::set_roles(&pool, id, &encode_roles(&roles))
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

    tracing::info!(user_id = id, roles = %user.roles, by = actor.id, "roles changed");
    Ok(Json(UserResponse::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_are_normalized() {
        let set = parse_roles(&["Police Officer".into(), "detective".into()]).unwrap();
        assert!(set.has(Role::PoliceOfficer));
        assert_eq!(set.primary(), Role::Detective);
    }

    #[test]
    fn unknown_role_is_a_field_error() {
        let err = parse_roles(&["detective".into(), "mayor".into()]).unwrap_err();
        assert!(err.field_errors["roles"].contains("mayor"));
    }

    #[test]
    fn no_roles_means_base_user() {
        assert_eq!(parse_roles(&[]).unwrap().roles(), &[Role::BaseUser]);
    }
}
