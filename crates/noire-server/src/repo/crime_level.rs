use noire_types::{AppError, CrimeLevel};
use sqlx::{Pool, Sqlite};

use crate::error_convert::SqlxErrorExt;

/// All crime levels, most severe first.
pub async fn list(pool: &Pool<Sqlite>) -> Result<Vec<CrimeLevel>, AppError> {
    sqlx::query_as::<_, CrimeLevel>("SELECT id, name, level FROM crime_levels ORDER BY level")
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<CrimeLevel>, AppError> {
    sqlx::query_as::<_, CrimeLevel>("SELECT id, name, level FROM crime_levels WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
