use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "validation")]
use validator::Validate;

use crate::error::AppError;
use crate::lifecycle::{
    CaseFacts, CaseStatus, FormationType, ReviewDecision, ReviewStage, MAX_REJECTIONS,
};

// ── Crime levels ────────────────────────────────────────────────────

/// Severity ordinal of the most serious crime level.
pub const CRITICAL_LEVEL: i64 = 0;

/// A crime severity. `level` is the ordinal (0 = Critical … 3 = Minor),
/// independent of the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct CrimeLevel {
    pub id: i64,
    pub name: String,
    pub level: i64,
}

// ── DB row structs ──────────────────────────────────────────────────

/// A case row joined with its crime level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Case {
    pub id: i64,
    pub case_number: String,
    pub title: String,
    pub description: String,
    pub formation_type: FormationType,
    pub status: CaseStatus,
    pub crime_level_id: i64,
    pub crime_level: i64,
    pub crime_level_name: String,
    pub rejection_count: i64,
    pub filed_by: i64,
    pub filed_by_hierarchy: i32,
    pub assigned_detective_id: Option<i64>,
    pub assigned_sergeant_id: Option<i64>,
    pub crime_scene_location: Option<String>,
    pub crime_scene_datetime: Option<DateTime<Utc>>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// The snapshot the lifecycle gate decides on.
    pub fn facts(&self) -> CaseFacts {
        CaseFacts {
            status: self.status,
            formation_type: self.formation_type,
            rejection_count: self.rejection_count,
            filed_by: self.filed_by,
            filed_by_hierarchy: self.filed_by_hierarchy,
        }
    }

    pub fn is_assigned(&self, user_id: i64) -> bool {
        self.assigned_detective_id == Some(user_id) || self.assigned_sergeant_id == Some(user_id)
    }
}

/// A person attached to a case as complainant. Exactly one per case is primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Complainant {
    pub id: i64,
    pub case_id: i64,
    pub user_id: i64,
    pub statement: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// One immutable review decision in a case's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Review {
    pub id: i64,
    pub case_id: i64,
    pub reviewer_id: i64,
    pub reviewer_role: String,
    pub reviewer_hierarchy: i32,
    pub stage: ReviewStage,
    pub decision: ReviewDecision,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A witness recorded at a crime scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Witness {
    pub id: i64,
    pub case_id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub national_id: Option<String>,
}

// ── API response types ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CrimeLevelResponse {
    pub id: i64,
    pub name: String,
    pub level: i64,
}

impl From<CrimeLevel> for CrimeLevelResponse {
    fn from(c: CrimeLevel) -> Self {
        Self {
            id: c.id,
            name: c.name,
            level: c.level,
        }
    }
}

/// API response shape for a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseResponse {
    pub id: i64,
    pub case_number: String,
    pub title: String,
    pub description: String,
    pub formation_type: FormationType,
    pub status: CaseStatus,
    pub status_label: String,
    pub crime_level: CrimeLevelResponse,
    pub rejection_count: i64,
    /// True once the case can never be resubmitted.
    pub is_permanently_rejected: bool,
    pub filed_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_detective: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_sergeant: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_scene_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_scene_datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Case> for CaseResponse {
    fn from(c: Case) -> Self {
        Self {
            id: c.id,
            case_number: c.case_number,
            title: c.title,
            description: c.description,
            formation_type: c.formation_type,
            status: c.status,
            status_label: c.status.label().to_string(),
            crime_level: CrimeLevelResponse {
                id: c.crime_level_id,
                name: c.crime_level_name,
                level: c.crime_level,
            },
            rejection_count: c.rejection_count,
            is_permanently_rejected: c.rejection_count >= MAX_REJECTIONS,
            filed_by: c.filed_by,
            assigned_detective: c.assigned_detective_id,
            assigned_sergeant: c.assigned_sergeant_id,
            crime_scene_location: c.crime_scene_location,
            crime_scene_datetime: c.crime_scene_datetime.map(|d| d.to_rfc3339()),
            opened_at: c.opened_at.map(|d| d.to_rfc3339()),
            closed_at: c.closed_at.map(|d| d.to_rfc3339()),
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComplainantResponse {
    pub id: i64,
    pub case: i64,
    pub user: i64,
    pub statement: String,
    pub is_primary: bool,
    pub created_at: String,
}

impl From<Complainant> for ComplainantResponse {
    fn from(c: Complainant) -> Self {
        Self {
            id: c.id,
            case: c.case_id,
            user: c.user_id,
            statement: c.statement,
            is_primary: c.is_primary,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewResponse {
    pub id: i64,
    pub reviewer: i64,
    pub reviewer_role: String,
    pub reviewer_hierarchy: i32,
    pub stage: ReviewStage,
    pub decision: ReviewDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: r.id,
            reviewer: r.reviewer_id,
            reviewer_role: r.reviewer_role,
            reviewer_hierarchy: r.reviewer_hierarchy,
            stage: r.stage,
            decision: r.decision,
            rejection_reason: r.rejection_reason,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WitnessResponse {
    pub id: i64,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub national_id: Option<String>,
}

impl From<Witness> for WitnessResponse {
    fn from(w: Witness) -> Self {
        Self {
            id: w.id,
            full_name: w.full_name,
            phone: w.phone,
            national_id: w.national_id,
        }
    }
}

/// Case detail: the case plus its complainants, witnesses, and review history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseDetailResponse {
    #[serde(flatten)]
    pub case: CaseResponse,
    pub complainants: Vec<ComplainantResponse>,
    pub witnesses: Vec<WitnessResponse>,
    pub reviews: Vec<ReviewResponse>,
}

/// The limited view of a case exposed without authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PublicCaseResponse {
    pub id: i64,
    pub case_number: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crime_scene_location: Option<String>,
    pub crime_level: CrimeLevelResponse,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<String>,
}

impl From<Case> for PublicCaseResponse {
    fn from(c: Case) -> Self {
        Self {
            id: c.id,
            case_number: c.case_number,
            title: c.title,
            crime_scene_location: c.crime_scene_location,
            crime_level: CrimeLevelResponse {
                id: c.crime_level_id,
                name: c.crime_level_name,
                level: c.crime_level,
            },
            status: c.status,
            opened_at: c.opened_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// Paged case listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseListResponse {
    pub cases: Vec<CaseResponse>,
    pub total: i64,
}

// ── Request types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct WitnessInput {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 200, message = "Witness name is required"))
    )]
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
}

/// Request to file a new case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateCaseRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 200, message = "Title is required"))
    )]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Crime level primary key.
    pub crime_level: i64,
    pub formation_type: FormationType,
    #[serde(default)]
    pub complainant_statement: Option<String>,
    #[serde(default)]
    pub crime_scene_location: Option<String>,
    #[serde(default)]
    pub crime_scene_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    #[cfg_attr(feature = "validation", validate(nested))]
    pub witnesses: Vec<WitnessInput>,
    /// Keep a complaint as a draft instead of sending it to cadet review.
    #[serde(default)]
    pub save_as_draft: bool,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

impl CreateCaseRequest {
    /// Formation-specific required fields.
    pub fn check_formation_fields(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.formation_type {
            FormationType::Complaint => {
                if is_blank(&self.complainant_statement) {
                    return Err(AppError::field(
                        "complainant_statement",
                        "A complaint requires the complainant's statement",
                    ));
                }
            }
            FormationType::CrimeScene => {
                if is_blank(&self.crime_scene_location) {
                    return Err(AppError::field(
                        "crime_scene_location",
                        "A crime scene report requires the location",
                    ));
                }
                match self.crime_scene_datetime {
                    None => {
                        return Err(AppError::field(
                            "crime_scene_datetime",
                            "A crime scene report requires the date and time of the crime",
                        ))
                    }
                    Some(at) if at > now => {
                        return Err(AppError::field(
                            "crime_scene_datetime",
                            "The crime scene date and time cannot be in the future",
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }
}

/// Body of `cadet_review` / `officer_review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewCaseRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Partial update of a case. Only provided fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct UpdateCaseRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, max = 200, message = "Title must not be empty"))
    )]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crime_scene_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_detective: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_sergeant: Option<i64>,
    /// Administrator-only override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
}

impl UpdateCaseRequest {
    pub fn touches_content(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.crime_level.is_some()
            || self.crime_scene_location.is_some()
    }

    pub fn touches_assignment(&self) -> bool {
        self.assigned_detective.is_some() || self.assigned_sergeant.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct JoinCaseRequest {
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "A statement is required to join a case"))
    )]
    pub statement: String,
}

/// Query parameters for case listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct CaseListParams {
    pub status: Option<CaseStatus>,
    pub formation_type: Option<FormationType>,
    pub assigned_detective: Option<i64>,
    pub assigned_sergeant: Option<i64>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl CaseListParams {
    /// Clamp paging to sane bounds: offset ≥ 0, 1 ≤ limit ≤ 100 (default 20).
    pub fn paging(&self) -> (i64, i64) {
        let offset = self.offset.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(20).clamp(1, 100);
        (offset, limit)
    }
}
