use chrono::Utc;
use noire_types::{AppError, SubmissionStatus, SuspectSubmission};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const SUBMISSION_COLUMNS: &str = "ss.id, ss.case_id, ss.submitted_by, ss.reasoning, ss.status, \
     ss.review_notes, ss.reviewed_by, ss.reviewed_at, ss.created_at";

/// Insert a pending submission and its suspect links. Returns `None` when
/// the case already has a pending submission.
pub async fn create(
    conn: &mut SqliteConnection,
    case_id: i64,
    submitted_by: i64,
    reasoning: &str,
    suspects: &[i64],
) -> Result<Option<i64>, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO suspect_submissions (case_id, submitted_by, reasoning, status, created_at)
        SELECT ?1, ?2, ?3, ?4, ?5
        WHERE NOT EXISTS (
            SELECT 1 FROM suspect_submissions WHERE case_id = ?1 AND status = ?4
        )
        RETURNING id
        "#,
    )
    .bind(case_id)
    .bind(submitted_by)
    .bind(reasoning.trim())
    .bind(SubmissionStatus::Pending)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    let Some(id) = id else {
        return Ok(None);
    };

    for suspect_id in suspects {
        sqlx::query(
            "INSERT OR IGNORE INTO submission_suspects (submission_id, suspect_id) VALUES (?, ?)",
        )
        .bind(id)
        .bind(suspect_id)
        .execute(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    }

    Ok(Some(id))
}

pub async fn find_by_id(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<Option<SuspectSubmission>, AppError> {
    sqlx::query_as::<_, SuspectSubmission>(&format!(
        "SELECT {SUBMISSION_COLUMNS} FROM suspect_submissions ss WHERE ss.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Submissions, optionally for one case. `assignee` restricts to cases where
/// that user is the assigned detective or sergeant.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    assignee: Option<i64>,
) -> Result<Vec<SuspectSubmission>, AppError> {
    sqlx::query_as::<_, SuspectSubmission>(&format!(
        r#"
        SELECT {SUBMISSION_COLUMNS}
        FROM suspect_submissions ss
        JOIN cases c ON c.id = ss.case_id
        WHERE (?1 IS NULL OR ss.case_id = ?1)
          AND (?2 IS NULL OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2)
        ORDER BY ss.id
        "#
    ))
    .bind(case_id)
    .bind(assignee)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn suspect_ids(pool: &Pool<Sqlite>, submission_id: i64) -> Result<Vec<i64>, AppError> {
    sqlx::query_scalar::<_, i64>(
        "SELECT suspect_id FROM submission_suspects WHERE submission_id = ? ORDER BY suspect_id",
    )
    .bind(submission_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Record the sergeant's decision while the submission is still pending.
/// False when another reviewer got there first.
pub async fn review(
    conn: &mut SqliteConnection,
    id: i64,
    status: SubmissionStatus,
    review_notes: Option<&str>,
    reviewed_by: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE suspect_submissions
        SET status = ?, review_notes = ?, reviewed_by = ?, reviewed_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status)
    .bind(review_notes.map(str::trim).filter(|n| !n.is_empty()))
    .bind(reviewed_by)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}
