use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Lowest crime level ordinal for which bail may be set (medium and minor).
pub const MIN_BAIL_CRIME_LEVEL: i64 = 2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum Verdict {
    Guilty,
    Innocent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Trial {
    pub id: i64,
    pub case_id: i64,
    pub suspect_id: i64,
    pub captain_decision_id: i64,
    pub judge_id: i64,
    pub created_by: i64,
    pub verdict: Option<Verdict>,
    pub punishment_title: Option<String>,
    pub punishment_description: Option<String>,
    pub verdict_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrialResponse {
    pub id: i64,
    pub case: i64,
    pub suspect: i64,
    pub captain_decision: i64,
    pub judge: i64,
    pub created_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punishment_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub punishment_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict_at: Option<String>,
    pub created_at: String,
}

impl From<Trial> for TrialResponse {
    fn from(t: Trial) -> Self {
        Self {
            id: t.id,
            case: t.case_id,
            suspect: t.suspect_id,
            captain_decision: t.captain_decision_id,
            judge: t.judge_id,
            created_by: t.created_by,
            verdict: t.verdict,
            punishment_title: t.punishment_title,
            punishment_description: t.punishment_description,
            verdict_at: t.verdict_at.map(|d| d.to_rfc3339()),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateTrialRequest {
    pub captain_decision: i64,
    /// User id of the presiding judge.
    pub judge: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerdictRequest {
    pub verdict: Verdict,
    #[serde(default)]
    pub punishment_title: Option<String>,
    #[serde(default)]
    pub punishment_description: Option<String>,
}

impl VerdictRequest {
    pub fn check(&self) -> Result<(), AppError> {
        let has_title = self
            .punishment_title
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if self.verdict == Verdict::Guilty && !has_title {
            return Err(AppError::field(
                "punishment_title",
                "A guilty verdict requires a punishment",
            ));
        }
        Ok(())
    }
}

// ── Bail ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum BailStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Bail {
    pub id: i64,
    pub case_id: i64,
    pub suspect_id: i64,
    pub amount: i64,
    pub status: BailStatus,
    pub set_by: i64,
    pub paid_by: Option<i64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BailResponse {
    pub id: i64,
    pub case: i64,
    pub suspect: i64,
    pub amount: i64,
    pub status: BailStatus,
    pub set_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    pub created_at: String,
}

impl From<Bail> for BailResponse {
    fn from(b: Bail) -> Self {
        Self {
            id: b.id,
            case: b.case_id,
            suspect: b.suspect_id,
            amount: b.amount,
            status: b.status,
            set_by: b.set_by,
            paid_by: b.paid_by,
            paid_at: b.paid_at.map(|d| d.to_rfc3339()),
            created_at: b.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateBailRequest {
    pub suspect: i64,
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, message = "Bail amount must be positive"))
    )]
    pub amount: i64,
}

/// Bail is only available for medium and minor crimes.
pub fn bail_allowed(crime_level: i64) -> bool {
    crime_level >= MIN_BAIL_CRIME_LEVEL
}
