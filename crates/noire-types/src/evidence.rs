use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum EvidenceType {
    Testimony,
    Biological,
    Vehicle,
    IdentityDocument,
    Other,
}

/// A piece of evidence recorded against a case.
///
/// The optional columns are type-specific: `transcript` for testimony,
/// `lab_result` for biological samples, the vehicle fields for vehicles,
/// and `owner_full_name` for identity documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Evidence {
    pub id: i64,
    pub case_id: i64,
    pub evidence_type: EvidenceType,
    pub title: String,
    pub description: String,
    pub recorded_by: i64,
    pub transcript: Option<String>,
    pub lab_result: Option<String>,
    pub vehicle_model: Option<String>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
    pub serial_number: Option<String>,
    pub owner_full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EvidenceResponse {
    pub id: i64,
    pub case: i64,
    pub evidence_type: EvidenceType,
    pub title: String,
    pub description: String,
    pub recorded_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lab_result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_full_name: Option<String>,
    pub created_at: String,
}

impl From<Evidence> for EvidenceResponse {
    fn from(e: Evidence) -> Self {
        Self {
            id: e.id,
            case: e.case_id,
            evidence_type: e.evidence_type,
            title: e.title,
            description: e.description,
            recorded_by: e.recorded_by,
            transcript: e.transcript,
            lab_result: e.lab_result,
            vehicle_model: e.vehicle_model,
            color: e.color,
            license_plate: e.license_plate,
            serial_number: e.serial_number,
            owner_full_name: e.owner_full_name,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

/// Request to record evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateEvidenceRequest {
    pub case: i64,
    pub evidence_type: EvidenceType,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 200, message = "Title is required"))
    )]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub lab_result: Option<String>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub license_plate: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub owner_full_name: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl CreateEvidenceRequest {
    /// Type-specific constraints that span more than one field.
    pub fn check_type_fields(&self) -> Result<(), AppError> {
        match self.evidence_type {
            EvidenceType::Vehicle => {
                if present(&self.license_plate) == present(&self.serial_number) {
                    return Err(AppError::non_field(
                        "A vehicle must have exactly one of a license plate or a serial number",
                    ));
                }
                if !present(&self.vehicle_model) {
                    return Err(AppError::field("vehicle_model", "Vehicle model is required"));
                }
            }
            EvidenceType::Testimony => {
                if !present(&self.transcript) {
                    return Err(AppError::field(
                        "transcript",
                        "Testimony evidence requires a transcript",
                    ));
                }
            }
            EvidenceType::IdentityDocument => {
                if !present(&self.owner_full_name) {
                    return Err(AppError::field(
                        "owner_full_name",
                        "Identity documents require the owner's full name",
                    ));
                }
            }
            EvidenceType::Biological | EvidenceType::Other => {}
        }
        Ok(())
    }
}

/// Query parameters for evidence listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct EvidenceListParams {
    pub case: Option<i64>,
}
