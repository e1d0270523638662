use chrono::{DateTime, Datelike, Utc};
use noire_types::{
    AppError, Case, CaseListParams, CaseStatus, FormationType, Witness, WitnessInput,
};
use rand::Rng;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::error_convert::SqlxErrorExt;

/// Case columns plus the joined crime level, in `Case` field order.
const CASE_SELECT: &str = r#"
    SELECT c.id, c.case_number, c.title, c.description, c.formation_type, c.status,
           c.crime_level_id, cl.level AS crime_level, cl.name AS crime_level_name,
           c.rejection_count, c.filed_by, c.filed_by_hierarchy,
           c.assigned_detective_id, c.assigned_sergeant_id,
           c.crime_scene_location, c.crime_scene_datetime,
           c.opened_at, c.closed_at, c.created_at, c.updated_at
    FROM cases c
    JOIN crime_levels cl ON cl.id = c.crime_level_id
"#;

/// Shared filter for list and count. `?5` restricts to cases the viewer
/// filed or is a complainant on; NULL means no restriction.
const CASE_FILTER: &str = r#"
    WHERE (?1 IS NULL OR c.status = ?1)
      AND (?2 IS NULL OR c.formation_type = ?2)
      AND (?3 IS NULL OR c.assigned_detective_id = ?3)
      AND (?4 IS NULL OR c.assigned_sergeant_id = ?4)
      AND (?5 IS NULL
           OR c.filed_by = ?5
           OR EXISTS (SELECT 1 FROM case_complainants cc
                      WHERE cc.case_id = c.id AND cc.user_id = ?5))
"#;

/// Attempts at drawing an unused case number before giving up.
const CASE_NUMBER_ATTEMPTS: usize = 5;

/// `LA-<year>-<6 random digits>`.
pub fn generate_case_number(now: DateTime<Utc>) -> String {
    let serial: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("LA-{}-{:06}", now.year(), serial)
}

/// Everything needed to file a case; status routing is decided by the caller.
#[derive(Debug)]
pub struct NewCase<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub formation_type: FormationType,
    pub status: CaseStatus,
    pub crime_level_id: i64,
    pub filed_by: i64,
    pub filed_by_hierarchy: i32,
    pub crime_scene_location: Option<&'a str>,
    pub crime_scene_datetime: Option<DateTime<Utc>>,
    /// Primary complainant statement; complaints only.
    pub complainant_statement: Option<&'a str>,
    pub witnesses: &'a [WitnessInput],
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Insert a case with its primary complainant and witnesses in one transaction.
pub async fn create(pool: &Pool<Sqlite>, new: NewCase<'_>) -> Result<Case, AppError> {
    let now = Utc::now();
    let opened_at = (new.status == CaseStatus::Open).then_some(now);

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let mut attempt = 0;
    let case_id = loop {
        attempt += 1;
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO cases
                (case_number, title, description, formation_type, status, crime_level_id,
                 rejection_count, filed_by, filed_by_hierarchy, crime_scene_location,
                 crime_scene_datetime, opened_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(generate_case_number(now))
        .bind(new.title.trim())
        .bind(new.description)
        .bind(new.formation_type)
        .bind(new.status)
        .bind(new.crime_level_id)
        .bind(new.filed_by)
        .bind(new.filed_by_hierarchy)
        .bind(blank_to_none(new.crime_scene_location))
        .bind(new.crime_scene_datetime)
        .bind(opened_at)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok(id) => break id,
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.message().contains("case_number")
                    && attempt < CASE_NUMBER_ATTEMPTS =>
            {
                tracing::debug!(attempt, "case number collision, drawing another");
            }
            Err(e) => return Err(e.into_app_error()),
        }
    };

    if let Some(statement) = blank_to_none(new.complainant_statement) {
        crate::repo::complainant::insert(&mut tx, case_id, new.filed_by, statement, true).await?;
    }

    for w in new.witnesses {
        sqlx::query(
            "INSERT INTO case_witnesses (case_id, full_name, phone, national_id) VALUES (?, ?, ?, ?)",
        )
        .bind(case_id)
        .bind(w.full_name.trim())
        .bind(blank_to_none(w.phone.as_deref()))
        .bind(blank_to_none(w.national_id.as_deref()))
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    }

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    find_by_id(pool, case_id)
        .await?
        .ok_or_else(|| AppError::internal("Case vanished after insert"))
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Case>, AppError> {
    sqlx::query_as::<_, Case>(&format!("{CASE_SELECT} WHERE c.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Page through cases. `viewer` restricts the result to cases that user
/// filed or complained on; `None` lists everything.
pub async fn list(
    pool: &Pool<Sqlite>,
    params: &CaseListParams,
    viewer: Option<i64>,
) -> Result<(Vec<Case>, i64), AppError> {
    let (offset, limit) = params.paging();

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM cases c {CASE_FILTER}"
    ))
    .bind(params.status)
    .bind(params.formation_type)
    .bind(params.assigned_detective)
    .bind(params.assigned_sergeant)
    .bind(viewer)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let rows = sqlx::query_as::<_, Case>(&format!(
        "{CASE_SELECT} {CASE_FILTER} ORDER BY c.created_at DESC, c.id DESC LIMIT ?6 OFFSET ?7"
    ))
    .bind(params.status)
    .bind(params.formation_type)
    .bind(params.assigned_detective)
    .bind(params.assigned_sergeant)
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok((rows, total))
}

/// Crime-scene cases whose status is one of `statuses`, newest first.
pub async fn list_public(
    pool: &Pool<Sqlite>,
    statuses: &[CaseStatus],
) -> Result<Vec<Case>, AppError> {
    if statuses.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(CASE_SELECT);
    qb.push(" WHERE c.formation_type = ");
    qb.push_bind(FormationType::CrimeScene);
    qb.push(" AND c.status IN (");
    let mut separated = qb.separated(", ");
    for status in statuses {
        separated.push_bind(*status);
    }
    separated.push_unseparated(")");
    qb.push(" ORDER BY c.opened_at DESC, c.id DESC");

    qb.build_query_as::<Case>()
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Conditionally move a case. Applies only while the case still has the
/// status and rejection count the caller decided on; returns whether it did.
/// Stamps `opened_at` the first time a case opens and `closed_at` on close.
pub async fn transition(
    conn: &mut SqliteConnection,
    id: i64,
    from: (CaseStatus, i64),
    to: (CaseStatus, i64),
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE cases
        SET status = ?1,
            rejection_count = ?2,
            opened_at = CASE WHEN ?1 = 'open' AND opened_at IS NULL THEN ?3 ELSE opened_at END,
            closed_at = CASE WHEN ?1 = 'closed' THEN ?3 ELSE closed_at END,
            updated_at = ?3
        WHERE id = ?4 AND status = ?5 AND rejection_count = ?6
        "#,
    )
    .bind(to.0)
    .bind(to.1)
    .bind(Utc::now())
    .bind(id)
    .bind(from.0)
    .bind(from.1)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() == 1)
}

/// Partial content update. `None` fields are left unchanged.
pub async fn update_content(
    conn: &mut SqliteConnection,
    id: i64,
    title: Option<&str>,
    description: Option<&str>,
    crime_level_id: Option<i64>,
    crime_scene_location: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE cases
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            crime_level_id = COALESCE(?, crime_level_id),
            crime_scene_location = COALESCE(?, crime_scene_location),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title.map(str::trim))
    .bind(description)
    .bind(crime_level_id)
    .bind(blank_to_none(crime_scene_location))
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Set the assigned detective and/or sergeant. `None` keeps the current one.
pub async fn assign(
    conn: &mut SqliteConnection,
    id: i64,
    detective: Option<i64>,
    sergeant: Option<i64>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE cases
        SET assigned_detective_id = COALESCE(?, assigned_detective_id),
            assigned_sergeant_id = COALESCE(?, assigned_sergeant_id),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(detective)
    .bind(sergeant)
    .bind(Utc::now())
    .bind(id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

pub async fn list_witnesses(pool: &Pool<Sqlite>, case_id: i64) -> Result<Vec<Witness>, AppError> {
    sqlx::query_as::<_, Witness>(
        "SELECT id, case_id, full_name, phone, national_id FROM case_witnesses WHERE case_id = ? ORDER BY id",
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn case_numbers_carry_the_year_and_six_digits() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap();
        let number = generate_case_number(now);
        assert!(number.starts_with("LA-2026-"));
        let serial = &number["LA-2026-".len()..];
        assert_eq!(serial.len(), 6);
        assert!(serial.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn blank_optional_text_becomes_null() {
        assert_eq!(blank_to_none(Some("  ")), None);
        assert_eq!(blank_to_none(Some(" 5th & Main ")), Some("5th & Main"));
        assert_eq!(blank_to_none(None), None);
    }
}
