use chrono::Utc;
use noire_types::{AppError, Trial, Verdict};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const TRIAL_COLUMNS: &str = "t.id, t.case_id, t.suspect_id, t.captain_decision_id, t.judge_id, \
     t.created_by, t.verdict, t.punishment_title, t.punishment_description, t.verdict_at, \
     t.created_at";

/// One trial per captain decision; a second insert is a 409.
pub async fn create(
    conn: &mut SqliteConnection,
    case_id: i64,
    suspect_id: i64,
    captain_decision_id: i64,
    judge_id: i64,
    created_by: i64,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO trials (case_id, suspect_id, captain_decision_id, judge_id, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(case_id)
    .bind(suspect_id)
    .bind(captain_decision_id)
    .bind(judge_id)
    .bind(created_by)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Trial>, AppError> {
    sqlx::query_as::<_, Trial>(&format!("SELECT {TRIAL_COLUMNS} FROM trials t WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Trials, optionally for one case. `viewer` restricts to trials that user
/// presides over or whose case they are assigned to.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    viewer: Option<i64>,
) -> Result<Vec<Trial>, AppError> {
    sqlx::query_as::<_, Trial>(&format!(
        r#"
        SELECT {TRIAL_COLUMNS}
        FROM trials t
        JOIN cases c ON c.id = t.case_id
        WHERE (?1 IS NULL OR t.case_id = ?1)
          AND (?2 IS NULL
               OR t.judge_id = ?2
               OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2)
        ORDER BY t.id
        "#
    ))
    .bind(case_id)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Record the verdict unless one exists already. False on a repeat.
pub async fn record_verdict(
    conn: &mut SqliteConnection,
    id: i64,
    verdict: Verdict,
    punishment_title: Option<&str>,
    punishment_description: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE trials
        SET verdict = ?, punishment_title = ?, punishment_description = ?, verdict_at = ?
        WHERE id = ? AND verdict IS NULL
        "#,
    )
    .bind(verdict)
    .bind(punishment_title.map(str::trim).filter(|t| !t.is_empty()))
    .bind(punishment_description.map(str::trim).filter(|d| !d.is_empty()))
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}
