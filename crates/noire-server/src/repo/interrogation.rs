use chrono::Utc;
use noire_types::{AppError, Interrogation, InterrogationStatus, RatingSide};
use sqlx::{Pool, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

const INTERROGATION_COLUMNS: &str = "x.id, x.case_id, x.suspect_id, x.detective_id, \
     x.sergeant_id, x.detective_rating, x.sergeant_rating, x.detective_notes, \
     x.sergeant_notes, x.status, x.created_at, x.updated_at";

pub async fn create(
    conn: &mut SqliteConnection,
    case_id: i64,
    suspect_id: i64,
    detective_id: i64,
    sergeant_id: i64,
) -> Result<i64, AppError> {
    let now = Utc::now();
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO interrogations
            (case_id, suspect_id, detective_id, sergeant_id, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(case_id)
    .bind(suspect_id)
    .bind(detective_id)
    .bind(sergeant_id)
    .bind(InterrogationStatus::Pending)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Interrogation>, AppError> {
    sqlx::query_as::<_, Interrogation>(&format!(
        "SELECT {INTERROGATION_COLUMNS} FROM interrogations x WHERE x.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Interrogations, optionally for one case. `assignee` restricts to those
/// the user takes part in or whose case they are assigned to.
pub async fn list(
    pool: &Pool<Sqlite>,
    case_id: Option<i64>,
    assignee: Option<i64>,
) -> Result<Vec<Interrogation>, AppError> {
    sqlx::query_as::<_, Interrogation>(&format!(
        r#"
        SELECT {INTERROGATION_COLUMNS}
        FROM interrogations x
        JOIN cases c ON c.id = x.case_id
        WHERE (?1 IS NULL OR x.case_id = ?1)
          AND (?2 IS NULL
               OR x.detective_id = ?2 OR x.sergeant_id = ?2
               OR c.assigned_detective_id = ?2 OR c.assigned_sergeant_id = ?2)
        ORDER BY x.id
        "#
    ))
    .bind(case_id)
    .bind(assignee)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

fn other_side(side: RatingSide) -> RatingSide {
    match side {
        RatingSide::Detective => RatingSide::Sergeant,
        RatingSide::Sergeant => RatingSide::Detective,
    }
}

/// Store one party's rating. The status flips to submitted in the same
/// statement once the other party's rating is already present, so two
/// parties submitting at once still end up submitted. False when this
/// side's rating was recorded concurrently.
pub async fn submit_rating(
    pool: &Pool<Sqlite>,
    id: i64,
    side: RatingSide,
    rating: i64,
    notes: Option<&str>,
) -> Result<bool, AppError> {
    let own = side.column_prefix();
    let other = other_side(side).column_prefix();
    let result = sqlx::query(&format!(
        r#"
        UPDATE interrogations
        SET {own}_rating = ?1,
            {own}_notes = ?2,
            status = CASE WHEN {other}_rating IS NOT NULL THEN 'submitted' ELSE 'pending' END,
            updated_at = ?3
        WHERE id = ?4 AND {own}_rating IS NULL
        "#
    ))
    .bind(rating)
    .bind(notes.map(str::trim).filter(|n| !n.is_empty()))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_are_opposite() {
        assert_eq!(other_side(RatingSide::Detective), RatingSide::Sergeant);
        assert_eq!(other_side(RatingSide::Sergeant), RatingSide::Detective);
    }
}
