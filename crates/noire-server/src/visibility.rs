//! Who may read what.
//!
//! Hidden records read as missing: callers answer 404 rather than 403 so
//! that existence does not leak.

use noire_types::{hierarchy, AppError, Case};
use sqlx::{Pool, Sqlite};

use crate::auth::extractors::Actor;
use crate::repo;

/// Administrators, police staff (cadet and up) and judges see every case.
pub fn sees_all_cases(actor: &Actor) -> bool {
    actor.is_admin() || actor.roles.is_police() || actor.roles.is_judge()
}

/// Whether `actor` may read `case`. `is_complainant` is whether they are
/// attached to it as a complainant.
pub fn can_view_case(actor: &Actor, case: &Case, is_complainant: bool) -> bool {
    sees_all_cases(actor) || case.filed_by == actor.id || is_complainant
}

/// Administrators and sergeants and above see every investigation.
pub fn sees_all_investigations(actor: &Actor) -> bool {
    actor.is_admin() || actor.at_least(hierarchy::SERGEANT)
}

/// Boards, suspects, submissions, interrogations and decisions of `case`.
pub fn can_investigate(actor: &Actor, case: &Case) -> bool {
    sees_all_investigations(actor) || case.is_assigned(actor.id)
}

/// Restriction for case listings: `None` lists everything, `Some(id)`
/// only cases that user filed or complained on.
pub fn case_scope(actor: &Actor) -> Option<i64> {
    (!sees_all_cases(actor)).then_some(actor.id)
}

/// Restriction for investigation listings: `None` lists everything,
/// `Some(id)` only cases that user is assigned to.
pub fn investigation_scope(actor: &Actor) -> Option<i64> {
    (!sees_all_investigations(actor)).then_some(actor.id)
}

fn case_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Case {id} not found"))
}

/// Load a case the actor may read, or 404.
pub async fn load_visible_case(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: i64,
) -> Result<Case, AppError> {
    let case = repo::case::find_by_id(pool, id)
        .await?
        .ok_or_else(|| case_not_found(id))?;
    if sees_all_cases(actor) || case.filed_by == actor.id {
        return Ok(case);
    }
    if repo::complainant::is_complainant(pool, id, actor.id).await? {
        Ok(case)
    } else {
        Err(case_not_found(id))
    }
}

/// Load a case whose investigation the actor may see, or 404.
pub async fn load_investigable_case(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: i64,
) -> Result<Case, AppError> {
    let case = repo::case::find_by_id(pool, id)
        .await?
        .ok_or_else(|| case_not_found(id))?;
    if can_investigate(actor, &case) {
        Ok(case)
    } else {
        Err(case_not_found(id))
    }
}
