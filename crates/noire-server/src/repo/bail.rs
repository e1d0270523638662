use chrono::Utc;
use noire_types::{AppError, Bail, BailStatus};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const BAIL_COLUMNS: &str =
    "id, case_id, suspect_id, amount, status, set_by, paid_by, paid_at, created_at";

pub async fn create(
    pool: &Pool<Sqlite>,
    case_id: i64,
    suspect_id: i64,
    amount: i64,
    set_by: i64,
) -> Result<Bail, AppError> {
    sqlx::query_as::<_, Bail>(&format!(
        "INSERT INTO bails (case_id, suspect_id, amount, status, set_by, created_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {BAIL_COLUMNS}"
    ))
    .bind(case_id)
    .bind(suspect_id)
    .bind(amount)
    .bind(BailStatus::Pending)
    .bind(set_by)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Bail>, AppError> {
    sqlx::query_as::<_, Bail>(&format!("SELECT {BAIL_COLUMNS} FROM bails WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn has_pending(pool: &Pool<Sqlite>, suspect_id: i64) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM bails WHERE suspect_id = ? AND status = 'pending')",
    )
    .bind(suspect_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Mark a pending bail paid. False when it was paid concurrently.
pub async fn pay(conn: &mut SqliteConnection, id: i64, paid_by: i64) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE bails SET status = 'paid', paid_by = ?, paid_at = ? \
         WHERE id = ? AND status = 'pending'",
    )
    .bind(paid_by)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}
