use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use noire_types::{rank_name, require_rank, AppError, RoleSet, User};
use sqlx::{Pool, Sqlite};

use super::jwt::Claims;
use crate::repo;

/// Extractor that requires authentication. Returns 401 if no valid token.
pub struct AuthRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// The authenticated caller with roles read fresh from the database, so a
/// role change applies to the next request rather than the next login.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub email: String,
    pub roles: RoleSet,
}

impl Actor {
    pub fn hierarchy(&self) -> i32 {
        self.roles.hierarchy()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }

    /// Canonical name of the role that gives the caller their rank.
    pub fn role_name(&self) -> &'static str {
        self.roles.primary().as_str()
    }

    pub fn at_least(&self, level: i32) -> bool {
        self.roles.at_least(level)
    }

    /// 403 unless the caller holds `level` (administrators always do).
    pub fn require(&self, level: i32, what: &str) -> Result<(), AppError> {
        require_rank(&self.roles, level, what).map_err(AppError::from)
    }
}

impl From<User> for Actor {
    fn from(user: User) -> Self {
        let roles = user.role_set();
        Self {
            id: user.id,
            email: user.email,
            roles,
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Pool<Sqlite>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let pool = Pool::<Sqlite>::from_ref(state);
        let user = repo::user::find_by_id(&pool, claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("This account no longer exists"))?;

        Ok(Actor::from(user))
    }
}

/// Extractor that requires an authenticated caller at or above a hierarchy
/// level (see `noire_types::hierarchy`). Returns 401 if unauthenticated,
/// 403 if the caller's rank is too low.
pub struct RankRequired<const LEVEL: i32>(pub Actor);

impl<const LEVEL: i32, S> FromRequestParts<S> for RankRequired<LEVEL>
where
    S: Send + Sync,
    Pool<Sqlite>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = Actor::from_request_parts(parts, state).await?;
        if !actor.at_least(LEVEL) {
            return Err(AppError::forbidden(format!(
                "This action requires the rank of {} or above",
                rank_name(LEVEL)
            ))
            .with_code("forbidden"));
        }
        Ok(RankRequired(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use noire_types::hierarchy;

    fn actor(roles: &str) -> Actor {
        Actor::from(User {
            id: 3,
            username: "rusty".into(),
            email: "rusty@lapd.gov".into(),
            display_name: "Rusty Galloway".into(),
            password_hash: String::new(),
            roles: roles.into(),
            created_at: Utc::now(),
        })
    }

    #[test]
    fn actor_resolves_roles_from_user_row() {
        let a = actor("detective");
        assert_eq!(a.hierarchy(), hierarchy::DETECTIVE);
        assert_eq!(a.role_name(), "detective");
        assert!(a.require(hierarchy::OFFICER, "Recording evidence").is_ok());
    }

    #[test]
    fn insufficient_rank_is_forbidden_with_reason() {
        let err = actor("cadet")
            .require(hierarchy::SERGEANT, "Reviewing a suspect submission")
            .unwrap_err();
        assert_eq!(err.kind, noire_types::AppErrorKind::Forbidden);
        assert!(err.message.starts_with("Reviewing a suspect submission requires the rank of"));
    }

    #[test]
    fn administrator_passes_every_rank() {
        let a = actor("administrator");
        assert!(a.is_admin());
        assert!(a.require(hierarchy::CHIEF, "Chief review").is_ok());
    }
}
