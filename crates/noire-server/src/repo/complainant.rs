use chrono::Utc;
use noire_types::{AppError, CaseStatus, Complainant};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const COMPLAINANT_COLUMNS: &str = "id, case_id, user_id, statement, is_primary, created_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    case_id: i64,
    user_id: i64,
    statement: &str,
    is_primary: bool,
) -> Result<Complainant, AppError> {
    sqlx::query_as::<_, Complainant>(&format!(
        "INSERT INTO case_complainants (case_id, user_id, statement, is_primary, created_at) \
         VALUES (?, ?, ?, ?, ?) RETURNING {COMPLAINANT_COLUMNS}"
    ))
    .bind(case_id)
    .bind(user_id)
    .bind(statement.trim())
    .bind(is_primary)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Add a secondary complainant, but only while the case is in one of
/// `statuses`. Returns `None` when the case has moved on.
pub async fn join(
    conn: &mut SqliteConnection,
    case_id: i64,
    user_id: i64,
    statement: &str,
    statuses: &[CaseStatus],
) -> Result<Option<Complainant>, AppError> {
    if statuses.is_empty() {
        return Ok(None);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "INSERT INTO case_complainants (case_id, user_id, statement, is_primary, created_at) SELECT id, ",
    );
    qb.push_bind(user_id);
    qb.push(", ");
    qb.push_bind(statement.trim().to_string());
    qb.push(", 0, ");
    qb.push_bind(Utc::now());
    qb.push(" FROM cases WHERE id = ");
    qb.push_bind(case_id);
    qb.push(" AND status IN (");
    let mut separated = qb.separated(", ");
    for status in statuses {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");
    qb.push(format!(" RETURNING {COMPLAINANT_COLUMNS}"));

    qb.build_query_as::<Complainant>()
        .fetch_optional(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Complainants of a case, primary first.
pub async fn list_by_case(pool: &Pool<Sqlite>, case_id: i64) -> Result<Vec<Complainant>, AppError> {
    sqlx::query_as::<_, Complainant>(&format!(
        "SELECT {COMPLAINANT_COLUMNS} FROM case_complainants \
         WHERE case_id = ? ORDER BY is_primary DESC, id"
    ))
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn is_complainant(
    pool: &Pool<Sqlite>,
    case_id: i64,
    user_id: i64,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM case_complainants WHERE case_id = ? AND user_id = ?)",
    )
    .bind(case_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
