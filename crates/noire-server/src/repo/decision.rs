use chrono::Utc;
use noire_types::{AppError, CaptainDecision, DecisionStatus, GuiltDecision};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const DECISION_COLUMNS: &str = "d.id, d.interrogation_id, d.case_id, d.suspect_id, d.captain_id, \
     d.decision, d.reasoning, d.status, d.chief_id, d.chief_notes, d.created_at, d.updated_at";

#[derive(Debug, Clone, Copy)]
pub struct NewDecision<'a> {
    pub interrogation_id: i64,
    pub case_id: i64,
    pub suspect_id: i64,
    pub captain_id: i64,
    pub decision: GuiltDecision,
    pub reasoning: &'a str,
    pub status: DecisionStatus,
}

/// One decision per interrogation; a second insert is a 409.
pub async fn create(conn: &mut SqliteConnection, new: NewDecision<'_>) -> Result<i64, AppError> {
    let now = Utc::now();
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO captain_decisions
            (interrogation_id, case_id, suspect_id, captain_id, decision, reasoning, status,
             created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(new.interrogation_id)
    .bind(new.case_id)
    .bind(new.suspect_id)
    .bind(new.captain_id)
    .bind(new.decision)
    .bind(new.reasoning.trim())
    .bind(new.status)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<CaptainDecision>, AppError> {
    sqlx::query_as::<_, CaptainDecision>(&format!(
        "SELECT {DECISION_COLUMNS} FROM captain_decisions d WHERE d.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Decisions, optionally for one case. `assignee` restricts to cases where
/// that user is the assigned detective or sergeant.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    assignee: Option<i64>,
) -> Result<Vec<CaptainDecision>, AppError> {
    sqlx::query_as::<_, CaptainDecision>(&format!(
        r#"
        SELECT {DECISION_COLUMNS}
        FROM captain_decisions d
        JOIN cases c ON c.id = d.case_id
        WHERE (?1 IS NULL OR d.case_id = ?1)
          AND (?2 IS NULL OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2)
        ORDER BY d.id
        "#
    ))
    .bind(case_id)
    .bind(assignee)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Record the chief's ruling on a decision still awaiting it.
/// False when it was ruled on concurrently.
pub async fn chief_review(
    pool: &Pool<Sqlite>,
    id: i64,
    status: DecisionStatus,
    chief_id: i64,
    notes: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE captain_decisions
        SET status = ?, chief_id = ?, chief_notes = ?, updated_at = ?
        WHERE id = ? AND status = 'awaiting_chief'
        "#,
    )
    .bind(status)
    .bind(chief_id)
    .bind(notes.map(str::trim).filter(|n| !n.is_empty()))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}
