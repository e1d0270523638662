use chrono::Utc;
use noire_types::{AppError, CreateEvidenceRequest, Evidence};
use sqlx::{Pool, Sqlite};

use crate::error_convert::SqlxErrorExt;

const EVIDENCE_COLUMNS: &str = "id, case_id, evidence_type, title, description, recorded_by, \
     transcript, lab_result, vehicle_model, color, license_plate, serial_number, \
     owner_full_name, created_at";

fn normalized(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Insert evidence. Blank optional strings are stored as NULL so the
/// vehicle identifier constraint sees them as missing.
pub async fn create(
    pool: &Pool<Sqlite>,
    req: &CreateEvidenceRequest,
    recorded_by: i64,
) -> Result<Evidence, AppError> {
    sqlx::query_as::<_, Evidence>(&format!(
        r#"
        INSERT INTO evidence
            (case_id, evidence_type, title, description, recorded_by, transcript, lab_result,
             vehicle_model, color, license_plate, serial_number, owner_full_name, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {EVIDENCE_COLUMNS}
        "#
    ))
    .bind(req.case)
    .bind(req.evidence_type)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(recorded_by)
    .bind(normalized(&req.transcript))
    .bind(normalized(&req.lab_result))
    .bind(normalized(&req.vehicle_model))
    .bind(normalized(&req.color))
    .bind(normalized(&req.license_plate))
    .bind(normalized(&req.serial_number))
    .bind(normalized(&req.owner_full_name))
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<Evidence>, AppError> {
    sqlx::query_as::<_, Evidence>(&format!("SELECT {EVIDENCE_COLUMNS} FROM evidence WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Evidence, optionally restricted to one case, newest first.
pub async fn list(pool: &Pool<Sqlite>, case_id: Option<i64>) -> Result<Vec<Evidence>, AppError> {
    sqlx::query_as::<_, Evidence>(&format!(
        "SELECT {EVIDENCE_COLUMNS} FROM evidence WHERE (?1 IS NULL OR case_id = ?1) \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_only_values_are_dropped() {
        assert_eq!(normalized(&Some("   ".into())), None);
        assert_eq!(normalized(&Some(" 2NX-445 ".into())), Some("2NX-445"));
        assert_eq!(normalized(&None), None);
    }
}
