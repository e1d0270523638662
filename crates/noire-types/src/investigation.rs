use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::case::CRITICAL_LEVEL;
use crate::config::WorkflowConfig;
use crate::error::AppError;
use crate::lifecycle::ReviewDecision;

// ── Detective boards ────────────────────────────────────────────────

/// One board per case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct DetectiveBoard {
    pub id: i64,
    pub case_id: i64,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a board item links to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum BoardContentType {
    Evidence,
    Suspect,
}

/// A board item row. `linked_title` is resolved by the query from the
/// linked evidence or suspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct BoardItem {
    pub id: i64,
    pub board_id: i64,
    pub content_type: Option<BoardContentType>,
    pub object_id: Option<i64>,
    pub label: Option<String>,
    pub notes: String,
    pub position_x: f64,
    pub position_y: f64,
    pub linked_title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BoardItem {
    /// Explicit label, else the linked object's title, else `Item #<id>`.
    pub fn display_label(&self) -> String {
        [self.label.as_deref(), self.linked_title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Item #{}", self.id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct BoardConnection {
    pub id: i64,
    pub board_id: i64,
    pub from_item_id: i64,
    pub to_item_id: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BoardItemResponse {
    pub id: i64,
    pub board: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<BoardContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub display_label: String,
    pub notes: String,
    pub position_x: f64,
    pub position_y: f64,
    pub created_at: String,
}

impl From<BoardItem> for BoardItemResponse {
    fn from(i: BoardItem) -> Self {
        let display_label = i.display_label();
        Self {
            id: i.id,
            board: i.board_id,
            content_type: i.content_type,
            object_id: i.object_id,
            label: i.label,
            display_label,
            notes: i.notes,
            position_x: i.position_x,
            position_y: i.position_y,
            created_at: i.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BoardConnectionResponse {
    pub id: i64,
    pub board: i64,
    pub from_item: i64,
    pub to_item: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: String,
}

impl From<BoardConnection> for BoardConnectionResponse {
    fn from(c: BoardConnection) -> Self {
        Self {
            id: c.id,
            board: c.board_id,
            from_item: c.from_item_id,
            to_item: c.to_item_id,
            note: c.note,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// A board with everything pinned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DetectiveBoardResponse {
    pub id: i64,
    pub case: i64,
    pub created_by: i64,
    pub items: Vec<BoardItemResponse>,
    pub connections: Vec<BoardConnectionResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl DetectiveBoardResponse {
    pub fn new(
        board: DetectiveBoard,
        items: Vec<BoardItem>,
        connections: Vec<BoardConnection>,
    ) -> Self {
        Self {
            id: board.id,
            case: board.case_id,
            created_by: board.created_by,
            items: items.into_iter().map(BoardItemResponse::from).collect(),
            connections: connections
                .into_iter()
                .map(BoardConnectionResponse::from)
                .collect(),
            created_at: board.created_at.to_rfc3339(),
            updated_at: board.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBoardRequest {
    pub case: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateBoardItemRequest {
    pub board: i64,
    #[serde(default)]
    pub content_type: Option<BoardContentType>,
    #[serde(default)]
    pub object_id: Option<i64>,
    #[serde(default)]
    #[cfg_attr(
        feature = "validation",
        validate(length(max = 200, message = "Label must be at most 200 characters"))
    )]
    pub label: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default)]
    pub position_y: f64,
}

impl CreateBoardItemRequest {
    /// The link, if any. `content_type` and `object_id` come as a pair.
    pub fn link(&self) -> Result<Option<(BoardContentType, i64)>, AppError> {
        match (self.content_type, self.object_id) {
            (Some(kind), Some(id)) => Ok(Some((kind, id))),
            (None, None) => Ok(None),
            _ => Err(AppError::non_field(
                "content_type and object_id must be provided together",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateBoardItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateConnectionRequest {
    pub from_item: i64,
    pub to_item: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Query parameters shared by the investigation list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct InvestigationListParams {
    pub case: Option<i64>,
}

// ── Suspects ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum SuspectStatus {
    UnderPursuit,
    IntensivePursuit,
    Arrested,
    Cleared,
    Convicted,
    ReleasedOnBail,
}

impl SuspectStatus {
    /// Still being hunted.
    pub fn is_wanted(&self) -> bool {
        matches!(
            self,
            SuspectStatus::UnderPursuit | SuspectStatus::IntensivePursuit
        )
    }

    /// Statuses an investigator may set by hand; the rest follow from
    /// arrests, decisions, verdicts and bail.
    pub fn is_manually_settable(&self) -> bool {
        matches!(
            self,
            SuspectStatus::UnderPursuit | SuspectStatus::IntensivePursuit | SuspectStatus::Cleared
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Suspect {
    pub id: i64,
    pub case_id: i64,
    pub person_id: i64,
    pub full_name: String,
    pub reason: String,
    pub status: SuspectStatus,
    pub wanted_since: DateTime<Utc>,
    pub sergeant_approved: bool,
    pub arrest_warrant: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Suspect {
    /// Whole days on the wanted list, counting the first day.
    pub fn days_wanted(&self, now: DateTime<Utc>) -> i64 {
        (now - self.wanted_since).num_days().max(0) + 1
    }

    /// Status as readers see it: a suspect under pursuit for longer than
    /// the window reads as intensive pursuit. Stored statuses never decay.
    pub fn effective_status(&self, now: DateTime<Utc>, window_days: i64) -> SuspectStatus {
        if self.status == SuspectStatus::UnderPursuit
            && now - self.wanted_since > Duration::days(window_days)
        {
            SuspectStatus::IntensivePursuit
        } else {
            self.status
        }
    }
}

/// `days_wanted × (4 − crime level)`; zero once the suspect is no longer wanted.
pub fn danger_score(status: SuspectStatus, days_wanted: i64, crime_level: i64) -> i64 {
    if !status.is_wanted() {
        return 0;
    }
    days_wanted * (4 - crime_level).max(1)
}

pub fn reward_amount(danger_score: i64, reward_unit: i64) -> i64 {
    danger_score.saturating_mul(reward_unit)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SuspectResponse {
    pub id: i64,
    pub case: i64,
    pub person: i64,
    pub full_name: String,
    pub reason: String,
    pub status: SuspectStatus,
    pub days_wanted: i64,
    pub danger_score: i64,
    pub reward_amount: i64,
    pub sergeant_approved: bool,
    pub arrest_warrant: bool,
    pub wanted_since: String,
    pub created_at: String,
}

impl SuspectResponse {
    /// Build the response, deriving the time-dependent fields at `now`.
    pub fn build(
        s: Suspect,
        crime_level: i64,
        now: DateTime<Utc>,
        workflow: &WorkflowConfig,
    ) -> Self {
        let status = s.effective_status(now, workflow.intensive_pursuit_days);
        let days = s.days_wanted(now);
        let score = danger_score(status, days, crime_level);
        Self {
            id: s.id,
            case: s.case_id,
            person: s.person_id,
            full_name: s.full_name,
            reason: s.reason,
            status,
            days_wanted: days,
            danger_score: score,
            reward_amount: reward_amount(score, workflow.reward_unit),
            sergeant_approved: s.sergeant_approved,
            arrest_warrant: s.arrest_warrant,
            wanted_since: s.wanted_since.to_rfc3339(),
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateSuspectRequest {
    pub case: i64,
    /// User id of the person suspected.
    pub person: i64,
    /// Defaults to the person's display name.
    #[serde(default)]
    pub full_name: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "A reason is required"))
    )]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateSuspectRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SuspectStatus>,
}

// ── Suspect submissions ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct SuspectSubmission {
    pub id: i64,
    pub case_id: i64,
    pub submitted_by: i64,
    pub reasoning: String,
    pub status: SubmissionStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SuspectSubmissionResponse {
    pub id: i64,
    pub case: i64,
    pub submitted_by: i64,
    pub suspects: Vec<i64>,
    pub reasoning: String,
    pub status: SubmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

impl SuspectSubmissionResponse {
    pub fn new(s: SuspectSubmission, suspects: Vec<i64>) -> Self {
        Self {
            id: s.id,
            case: s.case_id,
            submitted_by: s.submitted_by,
            suspects,
            reasoning: s.reasoning,
            status: s.status,
            review_notes: s.review_notes,
            reviewed_by: s.reviewed_by,
            reviewed_at: s.reviewed_at.map(|d| d.to_rfc3339()),
            created_at: s.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateSubmissionRequest {
    pub case: i64,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "At least one suspect is required"))
    )]
    pub suspects: Vec<i64>,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Reasoning is required"))
    )]
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReviewSubmissionRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub review_notes: Option<String>,
}

impl ReviewSubmissionRequest {
    pub fn check(&self) -> Result<(), AppError> {
        let has_notes = self
            .review_notes
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        if self.decision == ReviewDecision::Rejected && !has_notes {
            return Err(AppError::field(
                "review_notes",
                "Review notes are required when rejecting a submission",
            ));
        }
        Ok(())
    }
}

// ── Interrogations ──────────────────────────────────────────────────

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum InterrogationStatus {
    Pending,
    Submitted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct Interrogation {
    pub id: i64,
    pub case_id: i64,
    pub suspect_id: i64,
    pub detective_id: i64,
    pub sergeant_id: i64,
    pub detective_rating: Option<i64>,
    pub sergeant_rating: Option<i64>,
    pub detective_notes: Option<String>,
    pub sergeant_notes: Option<String>,
    pub status: InterrogationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which party of an interrogation is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingSide {
    Detective,
    Sergeant,
}

impl RatingSide {
    pub fn column_prefix(&self) -> &'static str {
        match self {
            RatingSide::Detective => "detective",
            RatingSide::Sergeant => "sergeant",
        }
    }
}

impl Interrogation {
    /// Resolve which side `user_id` rates for, refusing outsiders and repeats.
    pub fn rating_side(&self, user_id: i64) -> Result<RatingSide, AppError> {
        let side = if user_id == self.detective_id {
            RatingSide::Detective
        } else if user_id == self.sergeant_id {
            RatingSide::Sergeant
        } else {
            return Err(AppError::forbidden(
                "Only the interrogating detective and sergeant can submit ratings",
            )
            .with_code("forbidden"));
        };
        let already = match side {
            RatingSide::Detective => self.detective_rating.is_some(),
            RatingSide::Sergeant => self.sergeant_rating.is_some(),
        };
        if already {
            return Err(AppError::conflict(format!(
                "The {} rating for this interrogation has already been submitted",
                side.column_prefix()
            )));
        }
        Ok(side)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InterrogationResponse {
    pub id: i64,
    pub case: i64,
    pub suspect: i64,
    pub detective: i64,
    pub sergeant: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detective_rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sergeant_rating: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detective_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sergeant_notes: Option<String>,
    pub status: InterrogationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Interrogation> for InterrogationResponse {
    fn from(i: Interrogation) -> Self {
        Self {
            id: i.id,
            case: i.case_id,
            suspect: i.suspect_id,
            detective: i.detective_id,
            sergeant: i.sergeant_id,
            detective_rating: i.detective_rating,
            sergeant_rating: i.sergeant_rating,
            detective_notes: i.detective_notes,
            sergeant_notes: i.sergeant_notes,
            status: i.status,
            created_at: i.created_at.to_rfc3339(),
            updated_at: i.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateInterrogationRequest {
    pub suspect: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct SubmitRatingsRequest {
    #[cfg_attr(
        feature = "validation",
        validate(range(min = 1, max = 10, message = "Rating must be between 1 and 10"))
    )]
    pub rating: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

// ── Captain decisions ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum GuiltDecision {
    Guilty,
    NotGuilty,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum DecisionStatus {
    Final,
    AwaitingChief,
    ChiefApproved,
    ChiefRejected,
}

impl DecisionStatus {
    /// Initial status of a captain's decision: guilty findings on critical
    /// cases wait for the chief.
    pub fn initial(decision: GuiltDecision, crime_level: i64) -> Self {
        if decision == GuiltDecision::Guilty && crime_level == CRITICAL_LEVEL {
            DecisionStatus::AwaitingChief
        } else {
            DecisionStatus::Final
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct CaptainDecision {
    pub id: i64,
    pub interrogation_id: i64,
    pub case_id: i64,
    pub suspect_id: i64,
    pub captain_id: i64,
    pub decision: GuiltDecision,
    pub reasoning: String,
    pub status: DecisionStatus,
    pub chief_id: Option<i64>,
    pub chief_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaptainDecision {
    /// A trial may be opened on a guilty finding that is final or chief-approved.
    pub fn allows_trial(&self) -> bool {
        self.decision == GuiltDecision::Guilty
            && matches!(
                self.status,
                DecisionStatus::Final | DecisionStatus::ChiefApproved
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaptainDecisionResponse {
    pub id: i64,
    pub interrogation: i64,
    pub case: i64,
    pub suspect: i64,
    pub captain: i64,
    pub decision: GuiltDecision,
    pub reasoning: String,
    pub status: DecisionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chief_notes: Option<String>,
    pub created_at: String,
}

impl From<CaptainDecision> for CaptainDecisionResponse {
    fn from(d: CaptainDecision) -> Self {
        Self {
            id: d.id,
            interrogation: d.interrogation_id,
            case: d.case_id,
            suspect: d.suspect_id,
            captain: d.captain_id,
            decision: d.decision,
            reasoning: d.reasoning,
            status: d.status,
            chief: d.chief_id,
            chief_notes: d.chief_notes,
            created_at: d.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
pub struct CreateCaptainDecisionRequest {
    pub interrogation: i64,
    pub decision: GuiltDecision,
    #[cfg_attr(
        feature = "validation",
        validate(length(min = 1, message = "Reasoning is required"))
    )]
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ChiefReviewRequest {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: Option<&str>, linked: Option<&str>) -> BoardItem {
        BoardItem {
            id: 42,
            board_id: 1,
            content_type: linked.map(|_| BoardContentType::Evidence),
            object_id: linked.map(|_| 9),
            label: label.map(String::from),
            notes: String::new(),
            position_x: 0.0,
            position_y: 0.0,
            linked_title: linked.map(String::from),
            created_at: Utc::now(),
        }
    }

    fn suspect(status: SuspectStatus, days_ago: i64, now: DateTime<Utc>) -> Suspect {
        Suspect {
            id: 1,
            case_id: 1,
            person_id: 5,
            full_name: "Leland Monroe".into(),
            reason: "Seen at the scene".into(),
            status,
            wanted_since: now - Duration::days(days_ago),
            sergeant_approved: false,
            arrest_warrant: false,
            created_by: 2,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn board_item_label_fallbacks() {
        assert_eq!(item(Some("Matchbook"), Some("Photo")).display_label(), "Matchbook");
        assert_eq!(item(None, Some("Photo")).display_label(), "Photo");
        assert_eq!(item(Some("  "), None).display_label(), "Item #42");
        assert_eq!(item(None, None).display_label(), "Item #42");
    }

    #[test]
    fn board_item_link_must_be_paired() {
        let mut req = CreateBoardItemRequest {
            board: 1,
            content_type: Some(BoardContentType::Suspect),
            object_id: None,
            label: None,
            notes: String::new(),
            position_x: 10.0,
            position_y: 20.0,
        };
        let err = req.link().unwrap_err();
        assert_eq!(err.non_field_errors.len(), 1);

        req.object_id = Some(3);
        assert_eq!(req.link().unwrap(), Some((BoardContentType::Suspect, 3)));

        req.content_type = None;
        req.object_id = None;
        assert_eq!(req.link().unwrap(), None);
    }

    #[test]
    fn long_pursuit_reads_as_intensive() {
        let now = Utc::now();
        assert_eq!(
            suspect(SuspectStatus::UnderPursuit, 10, now).effective_status(now, 30),
            SuspectStatus::UnderPursuit
        );
        assert_eq!(
            suspect(SuspectStatus::UnderPursuit, 31, now).effective_status(now, 30),
            SuspectStatus::IntensivePursuit
        );
    }

    #[test]
    fn manual_intensive_pursuit_sticks_inside_window() {
        let now = Utc::now();
        assert_eq!(
            suspect(SuspectStatus::IntensivePursuit, 1, now).effective_status(now, 30),
            SuspectStatus::IntensivePursuit
        );
    }

    #[test]
    fn arrested_suspect_never_escalates() {
        let now = Utc::now();
        assert_eq!(
            suspect(SuspectStatus::Arrested, 90, now).effective_status(now, 30),
            SuspectStatus::Arrested
        );
    }

    #[test]
    fn danger_and_reward() {
        assert_eq!(danger_score(SuspectStatus::UnderPursuit, 10, 0), 40);
        assert_eq!(danger_score(SuspectStatus::IntensivePursuit, 10, 3), 10);
        assert_eq!(danger_score(SuspectStatus::Arrested, 10, 0), 0);
        assert_eq!(reward_amount(40, 20_000_000), 800_000_000);
    }

    #[test]
    fn suspect_response_derives_fields() {
        let workflow = WorkflowConfig::default();
        let now = Utc::now();
        let resp = SuspectResponse::build(suspect(SuspectStatus::UnderPursuit, 40, now), 1, now, &workflow);
        assert_eq!(resp.status, SuspectStatus::IntensivePursuit);
        assert_eq!(resp.days_wanted, 41);
        assert_eq!(resp.danger_score, 41 * 3);
        assert_eq!(resp.reward_amount, 41 * 3 * workflow.reward_unit);
    }

    fn interrogation() -> Interrogation {
        let now = Utc::now();
        Interrogation {
            id: 1,
            case_id: 1,
            suspect_id: 1,
            detective_id: 10,
            sergeant_id: 20,
            detective_rating: None,
            sergeant_rating: None,
            detective_notes: None,
            sergeant_notes: None,
            status: InterrogationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn each_party_rates_for_their_own_side() {
        let mut i = interrogation();
        assert_eq!(i.rating_side(10).unwrap(), RatingSide::Detective);
        i.detective_rating = Some(7);
        assert_eq!(i.rating_side(20).unwrap(), RatingSide::Sergeant);
        assert_eq!(RatingSide::Sergeant.column_prefix(), "sergeant");
    }

    #[test]
    fn outsiders_and_repeats_cannot_rate() {
        let mut i = interrogation();
        let err = i.rating_side(99).unwrap_err();
        assert_eq!(err.kind, crate::error::AppErrorKind::Forbidden);

        i.detective_rating = Some(5);
        let err = i.rating_side(10).unwrap_err();
        assert_eq!(err.kind, crate::error::AppErrorKind::Conflict);
    }

    #[test]
    fn critical_guilty_decisions_wait_for_chief() {
        assert_eq!(
            DecisionStatus::initial(GuiltDecision::Guilty, 0),
            DecisionStatus::AwaitingChief
        );
        assert_eq!(
            DecisionStatus::initial(GuiltDecision::Guilty, 1),
            DecisionStatus::Final
        );
        assert_eq!(
            DecisionStatus::initial(GuiltDecision::NotGuilty, 0),
            DecisionStatus::Final
        );
    }

    #[test]
    fn submission_rejection_needs_notes() {
        let req = ReviewSubmissionRequest {
            decision: ReviewDecision::Rejected,
            review_notes: None,
        };
        assert!(req.check().unwrap_err().field_errors.contains_key("review_notes"));
        let req = ReviewSubmissionRequest {
            decision: ReviewDecision::Approved,
            review_notes: None,
        };
        assert!(req.check().is_ok());
    }
}
