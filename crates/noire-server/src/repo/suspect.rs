use chrono::Utc;
use noire_types::{AppError, Suspect, SuspectStatus, UpdateSuspectRequest};
use sqlx::{Executor, Pool, Sqlite};

use crate::error_convert::SqlxErrorExt;

const SUSPECT_COLUMNS: &str = "s.id, s.case_id, s.person_id, s.full_name, s.reason, s.status, \
     s.wanted_since, s.sergeant_approved, s.arrest_warrant, s.created_by, s.created_at, \
     s.updated_at";

/// A suspect with the crime level of its case, which the danger score needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SuspectRow {
    #[sqlx(flatten)]
    pub suspect: Suspect,
    pub crime_level: i64,
}

fn select() -> String {
    format!(
        "SELECT {SUSPECT_COLUMNS}, cl.level AS crime_level \
         FROM suspects s \
         JOIN cases c ON c.id = s.case_id \
         JOIN crime_levels cl ON cl.id = c.crime_level_id"
    )
}

pub async fn create(
    pool: &Pool<Sqlite>,
    case_id: i64,
    person_id: i64,
    full_name: &str,
    reason: &str,
    created_by: i64,
) -> Result<i64, AppError> {
    let now = Utc::now();
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO suspects
            (case_id, person_id, full_name, reason, status, wanted_since, created_by,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(case_id)
    .bind(person_id)
    .bind(full_name.trim())
    .bind(reason.trim())
    .bind(SuspectStatus::UnderPursuit)
    .bind(now)
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<SuspectRow>, AppError> {
    sqlx::query_as::<_, SuspectRow>(&format!("{} WHERE s.id = ?", select()))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Suspects, optionally for one case. `assignee` restricts to cases where
/// that user is the assigned detective or sergeant.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    assignee: Option<i64>,
) -> Result<Vec<SuspectRow>, AppError> {
    sqlx::query_as::<_, SuspectRow>(&format!(
        "{} WHERE (?1 IS NULL OR s.case_id = ?1) \
         AND (?2 IS NULL OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2) \
         ORDER BY s.id",
        select()
    ))
    .bind(case_id)
    .bind(assignee)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Suspect ids of `ids` that belong to `case_id` and are still wanted.
pub async fn wanted_in_case(
    pool: &Pool<Sqlite>,
    case_id: i64,
    ids: &[i64],
) -> Result<Vec<i64>, AppError> {
    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        let wanted = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM suspects WHERE id = ? AND case_id = ? \
             AND status IN ('under_pursuit', 'intensive_pursuit'))",
        )
        .bind(id)
        .bind(case_id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
        if wanted {
            found.push(*id);
        }
    }
    Ok(found)
}

/// Edit name, reason or status. `None` fields keep their value.
pub async fn update(
    pool: &Pool<Sqlite>,
    id: i64,
    req: &UpdateSuspectRequest,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE suspects
        SET full_name = COALESCE(?, full_name),
            reason = COALESCE(?, reason),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(req.full_name.as_deref().map(str::trim))
    .bind(req.reason.as_deref().map(str::trim))
    .bind(req.status)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

pub async fn set_status<'e, E>(executor: E, id: i64, status: SuspectStatus) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE suspects SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Arrest a wanted suspect holding a warrant. False when the suspect was
/// no longer wanted by the time the update ran.
pub async fn arrest(pool: &Pool<Sqlite>, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE suspects SET status = 'arrested', updated_at = ? \
         WHERE id = ? AND arrest_warrant = 1 \
         AND status IN ('under_pursuit', 'intensive_pursuit')",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}

/// Grant approval and an arrest warrant to every suspect of a submission.
pub async fn approve_submitted<'e, E>(executor: E, submission_id: i64) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "UPDATE suspects SET sergeant_approved = 1, arrest_warrant = 1, updated_at = ? \
         WHERE id IN (SELECT suspect_id FROM submission_suspects WHERE submission_id = ?)",
    )
    .bind(Utc::now())
    .bind(submission_id)
    .execute(executor)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}
