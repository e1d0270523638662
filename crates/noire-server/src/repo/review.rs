use chrono::Utc;
use noire_types::{AppError, Review, ReviewDecision, ReviewStage};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

/// Who reviewed, snapshotted at decision time.
#[derive(Debug, Clone, Copy)]
pub struct Reviewer<'a> {
    pub id: i64,
    pub role: &'a str,
    pub hierarchy: i32,
}

/// Append a review record. Reviews are never updated or deleted.
pub async fn insert(
    conn: &mut SqliteConnection,
    case_id: i64,
    reviewer: Reviewer<'_>,
    stage: ReviewStage,
    decision: ReviewDecision,
    rejection_reason: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO case_reviews
            (case_id, reviewer_id, reviewer_role, reviewer_hierarchy, stage, decision,
             rejection_reason, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(case_id)
    .bind(reviewer.id)
    .bind(reviewer.role)
    .bind(reviewer.hierarchy)
    .bind(stage)
    .bind(decision)
    .bind(rejection_reason.map(str::trim))
    .bind(Utc::now())
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Review history of a case, oldest first.
pub async fn list_by_case(pool: &Pool<Sqlite>, case_id: i64) -> Result<Vec<Review>, AppError> {
    sqlx::query_as::<_, Review>(
        r#"
        SELECT id, case_id, reviewer_id, reviewer_role, reviewer_hierarchy, stage, decision,
               rejection_reason, created_at
        FROM case_reviews
        WHERE case_id = ?
        ORDER BY id
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
