//! Case lifecycle: the status enumeration, its transition table, and the
//! review gate.
//!
//! Every function here is pure: `(current state, actor, action) -> next state
//! | GateError`. The server applies the result with a conditional update so a
//! concurrent request that already moved the case loses cleanly.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::role::{hierarchy, rank_name, RoleSet};

/// Rejections after which a case can never be resubmitted.
pub const MAX_REJECTIONS: i64 = 3;

// ── Enumerations ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum CaseStatus {
    Draft,
    CadetReview,
    OfficerReview,
    Rejected,
    Open,
    UnderInvestigation,
    SuspectsIdentified,
    ArrestApproved,
    Interrogation,
    TrialPending,
    Closed,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 11] = [
        CaseStatus::Draft,
        CaseStatus::CadetReview,
        CaseStatus::OfficerReview,
        CaseStatus::Rejected,
        CaseStatus::Open,
        CaseStatus::UnderInvestigation,
        CaseStatus::SuspectsIdentified,
        CaseStatus::ArrestApproved,
        CaseStatus::Interrogation,
        CaseStatus::TrialPending,
        CaseStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "draft",
            CaseStatus::CadetReview => "cadet_review",
            CaseStatus::OfficerReview => "officer_review",
            CaseStatus::Rejected => "rejected",
            CaseStatus::Open => "open",
            CaseStatus::UnderInvestigation => "under_investigation",
            CaseStatus::SuspectsIdentified => "suspects_identified",
            CaseStatus::ArrestApproved => "arrest_approved",
            CaseStatus::Interrogation => "interrogation",
            CaseStatus::TrialPending => "trial_pending",
            CaseStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Title-case label for display.
    pub fn label(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "Draft",
            CaseStatus::CadetReview => "Cadet Review",
            CaseStatus::OfficerReview => "Officer Review",
            CaseStatus::Rejected => "Rejected",
            CaseStatus::Open => "Open",
            CaseStatus::UnderInvestigation => "Under Investigation",
            CaseStatus::SuspectsIdentified => "Suspects Identified",
            CaseStatus::ArrestApproved => "Arrest Approved",
            CaseStatus::Interrogation => "Interrogation",
            CaseStatus::TrialPending => "Trial Pending",
            CaseStatus::Closed => "Closed",
        }
    }

    /// Completes the sentence "the case is …".
    pub fn phrase(&self) -> &'static str {
        match self {
            CaseStatus::Draft => "a draft",
            CaseStatus::CadetReview => "in cadet review",
            CaseStatus::OfficerReview => "in officer review",
            CaseStatus::Rejected => "rejected",
            CaseStatus::Open => "open",
            CaseStatus::UnderInvestigation => "under investigation",
            CaseStatus::SuspectsIdentified => "awaiting approval of its identified suspects",
            CaseStatus::ArrestApproved => "cleared for arrests",
            CaseStatus::Interrogation => "in interrogation",
            CaseStatus::TrialPending => "pending trial",
            CaseStatus::Closed => "closed",
        }
    }

    /// Position along the forward path; `rejected` shares the draft slot.
    pub fn stage(&self) -> u8 {
        match self {
            CaseStatus::Draft | CaseStatus::Rejected => 0,
            CaseStatus::CadetReview => 1,
            CaseStatus::OfficerReview => 2,
            CaseStatus::Open => 3,
            CaseStatus::UnderInvestigation => 4,
            CaseStatus::SuspectsIdentified => 5,
            CaseStatus::ArrestApproved => 6,
            CaseStatus::Interrogation => 7,
            CaseStatus::TrialPending => 8,
            CaseStatus::Closed => 9,
        }
    }

    /// The transition table. Creation routing is not an edge; see [`route_new_case`].
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        use CaseStatus::*;
        matches!(
            (self, next),
            (Draft, CadetReview)
                | (Rejected, CadetReview)
                | (CadetReview, OfficerReview)
                | (CadetReview, Rejected)
                | (CadetReview, Draft)
                | (OfficerReview, Open)
                | (OfficerReview, Rejected)
                | (OfficerReview, Draft)
                | (Open, UnderInvestigation)
                | (UnderInvestigation, SuspectsIdentified)
                | (SuspectsIdentified, SuspectsIdentified)
                | (SuspectsIdentified, ArrestApproved)
                | (SuspectsIdentified, UnderInvestigation)
                | (ArrestApproved, Interrogation)
                | (Interrogation, Interrogation)
                | (Interrogation, TrialPending)
                | (TrialPending, Closed)
        )
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a case came into existence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum FormationType {
    Complaint,
    CrimeScene,
}

impl FormationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormationType::Complaint => "complaint",
            FormationType::CrimeScene => "crime_scene",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "complaint" => Some(FormationType::Complaint),
            "crime_scene" => Some(FormationType::CrimeScene),
            _ => None,
        }
    }

    /// Where a rejected case lands: complaints stay visibly rejected,
    /// crime-scene reports fall back to draft.
    pub fn rejected_status(&self) -> CaseStatus {
        match self {
            FormationType::Complaint => CaseStatus::Rejected,
            FormationType::CrimeScene => CaseStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum ReviewStage {
    CadetReview,
    OfficerReview,
}

impl ReviewStage {
    pub fn status(&self) -> CaseStatus {
        match self {
            ReviewStage::CadetReview => CaseStatus::CadetReview,
            ReviewStage::OfficerReview => CaseStatus::OfficerReview,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ReviewStage::CadetReview => "Cadet review",
            ReviewStage::OfficerReview => "Officer review",
        }
    }

    fn min_rank(&self) -> i32 {
        match self {
            ReviewStage::CadetReview => hierarchy::CADET,
            ReviewStage::OfficerReview => hierarchy::OFFICER,
        }
    }

    fn approved_status(&self) -> CaseStatus {
        match self {
            ReviewStage::CadetReview => CaseStatus::OfficerReview,
            ReviewStage::OfficerReview => CaseStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::Type))]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "server", sqlx(rename_all = "snake_case"))]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Actions that depend on the case being at a particular stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseAction {
    Resubmit,
    JoinCase,
    AssignDetective,
    RecordEvidence,
    CreateBoard,
    CreateSuspect,
    SubmitSuspects,
    ApproveSuspects,
    RejectSuspects,
    CreateInterrogation,
    DecideGuilt,
    SetBail,
    CreateTrial,
    RecordVerdict,
}

impl CaseAction {
    pub fn title(&self) -> &'static str {
        match self {
            CaseAction::Resubmit => "Resubmission",
            CaseAction::JoinCase => "Joining the case",
            CaseAction::AssignDetective => "Assigning a detective",
            CaseAction::RecordEvidence => "Recording evidence",
            CaseAction::CreateBoard => "Opening a detective board",
            CaseAction::CreateSuspect => "Adding a suspect",
            CaseAction::SubmitSuspects => "Submitting suspects for approval",
            CaseAction::ApproveSuspects => "Approving a suspect submission",
            CaseAction::RejectSuspects => "Rejecting a suspect submission",
            CaseAction::CreateInterrogation => "Starting an interrogation",
            CaseAction::DecideGuilt => "Recording a captain's decision",
            CaseAction::SetBail => "Setting bail",
            CaseAction::CreateTrial => "Creating a trial",
            CaseAction::RecordVerdict => "Recording a verdict",
        }
    }

    /// Statuses the action may start from and, when it moves the case,
    /// where it leaves it.
    fn rule(&self) -> (&'static [CaseStatus], Option<CaseStatus>) {
        use CaseStatus::*;
        match self {
            CaseAction::Resubmit => (&[Draft, Rejected], Some(CadetReview)),
            CaseAction::JoinCase => (&[], None),
            CaseAction::AssignDetective => (&[Open], Some(UnderInvestigation)),
            CaseAction::RecordEvidence => (
                &[
                    Draft,
                    CadetReview,
                    OfficerReview,
                    Rejected,
                    Open,
                    UnderInvestigation,
                    SuspectsIdentified,
                    ArrestApproved,
                    Interrogation,
                    TrialPending,
                ],
                None,
            ),
            CaseAction::CreateBoard => (
                &[
                    Open,
                    UnderInvestigation,
                    SuspectsIdentified,
                    ArrestApproved,
                    Interrogation,
                    TrialPending,
                ],
                None,
            ),
            CaseAction::CreateSuspect => (&[UnderInvestigation, SuspectsIdentified], None),
            CaseAction::SubmitSuspects => {
                (&[UnderInvestigation, SuspectsIdentified], Some(SuspectsIdentified))
            }
            CaseAction::ApproveSuspects => (&[SuspectsIdentified], Some(ArrestApproved)),
            CaseAction::RejectSuspects => (&[SuspectsIdentified], Some(UnderInvestigation)),
            CaseAction::CreateInterrogation => {
                (&[ArrestApproved, Interrogation], Some(Interrogation))
            }
            CaseAction::DecideGuilt => (&[Interrogation], None),
            CaseAction::SetBail => (&[ArrestApproved, Interrogation, TrialPending], None),
            CaseAction::CreateTrial => (&[Interrogation], Some(TrialPending)),
            CaseAction::RecordVerdict => (&[TrialPending], Some(Closed)),
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Why the gate refused an action. Authorization and state problems are
/// kept apart so the boundary can answer 403 vs 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    Forbidden { code: &'static str, message: String },
    InvalidState { code: &'static str, message: String },
    Validation { field: &'static str, message: String },
}

impl GateError {
    fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        GateError::Forbidden {
            code,
            message: message.into(),
        }
    }

    fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        GateError::InvalidState {
            code,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            GateError::Forbidden { message, .. }
            | GateError::InvalidState { message, .. }
            | GateError::Validation { message, .. } => message,
        }
    }
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for GateError {}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Forbidden { code, message } => AppError::forbidden(message).with_code(code),
            GateError::InvalidState { code, message } => {
                AppError::bad_request(message).with_code(code)
            }
            GateError::Validation { field, message } => AppError::field(field, message),
        }
    }
}

// ── Gate ───────────────────────────────────────────────────────────

/// The facts about a case the gate needs; everything else is irrelevant to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseFacts {
    pub status: CaseStatus,
    pub formation_type: FormationType,
    pub rejection_count: i64,
    pub filed_by: i64,
    pub filed_by_hierarchy: i32,
}

impl CaseFacts {
    pub fn is_permanently_rejected(&self) -> bool {
        self.rejection_count >= MAX_REJECTIONS
    }
}

/// Result of a successful review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub status: CaseStatus,
    pub rejection_count: i64,
}

impl ReviewOutcome {
    /// The decision moved the case to `open`; `opened_at` must be stamped.
    pub fn opens_case(&self) -> bool {
        self.status == CaseStatus::Open
    }
}

/// Fail unless `actor` holds at least `level`.
pub fn require_rank(actor: &RoleSet, level: i32, what: &str) -> Result<(), GateError> {
    if actor.at_least(level) {
        Ok(())
    } else {
        Err(GateError::forbidden(
            "forbidden",
            format!("{what} requires the rank of {} or above", rank_name(level)),
        ))
    }
}

/// Initial status of a freshly filed case.
pub fn route_new_case(
    formation: FormationType,
    actor: &RoleSet,
    save_as_draft: bool,
) -> Result<CaseStatus, GateError> {
    if formation == FormationType::CrimeScene {
        require_rank(actor, hierarchy::OFFICER, "Reporting a crime scene")?;
    }
    if actor.at_least(hierarchy::CHIEF) {
        return Ok(CaseStatus::Open);
    }
    if save_as_draft {
        return Ok(CaseStatus::Draft);
    }
    Ok(match formation {
        FormationType::Complaint => CaseStatus::CadetReview,
        FormationType::CrimeScene => CaseStatus::OfficerReview,
    })
}

fn review_state_detail(stage: ReviewStage, status: CaseStatus) -> String {
    match (stage, status) {
        (_, CaseStatus::Draft) => {
            "this case is a draft and has not been submitted for review yet".to_string()
        }
        (_, CaseStatus::Rejected) => {
            "this case was rejected and is waiting to be corrected and resubmitted".to_string()
        }
        (ReviewStage::CadetReview, CaseStatus::OfficerReview) => {
            "this case has already passed cadet review and is now in officer review".to_string()
        }
        (ReviewStage::OfficerReview, CaseStatus::CadetReview) => {
            "this case is still awaiting cadet review".to_string()
        }
        (_, CaseStatus::Closed) => "this case is closed".to_string(),
        (_, s) => format!(
            "this case has already been approved and is now {}",
            s.phrase()
        ),
    }
}

/// Decide a cadet or officer review.
pub fn review_case(
    case: &CaseFacts,
    stage: ReviewStage,
    actor_id: i64,
    actor: &RoleSet,
    decision: ReviewDecision,
    rejection_reason: Option<&str>,
) -> Result<ReviewOutcome, GateError> {
    require_rank(actor, stage.min_rank(), stage.title())?;

    if case.status != stage.status() {
        return Err(GateError::invalid_state(
            "invalid_status",
            format!(
                "{} is not possible: {}",
                stage.title(),
                review_state_detail(stage, case.status)
            ),
        ));
    }

    match decision {
        ReviewDecision::Approved => {
            if case.filed_by == actor_id {
                return Err(match stage {
                    ReviewStage::CadetReview => GateError::forbidden(
                        "self_approval",
                        "You cannot approve a case you filed yourself",
                    ),
                    ReviewStage::OfficerReview => GateError::forbidden(
                        "higher_rank_required",
                        "Higher-ranking officer required: you cannot approve a case you filed yourself",
                    ),
                });
            }
            if stage == ReviewStage::OfficerReview && actor.hierarchy() <= case.filed_by_hierarchy {
                return Err(GateError::forbidden(
                    "higher_rank_required",
                    format!(
                        "Higher-ranking officer required: this case was filed by a {} and must be approved by a {} or above",
                        rank_name(case.filed_by_hierarchy),
                        rank_name(case.filed_by_hierarchy + 1)
                    ),
                ));
            }
            Ok(ReviewOutcome {
                status: stage.approved_status(),
                rejection_count: case.rejection_count,
            })
        }
        ReviewDecision::Rejected => {
            let has_reason = rejection_reason
                .map(|r| !r.trim().is_empty())
                .unwrap_or(false);
            if !has_reason {
                return Err(GateError::Validation {
                    field: "rejection_reason",
                    message: "A rejection reason is required when rejecting a case".to_string(),
                });
            }
            Ok(ReviewOutcome {
                status: case.formation_type.rejected_status(),
                rejection_count: (case.rejection_count + 1).min(MAX_REJECTIONS),
            })
        }
    }
}

/// Send a draft or rejected case back into review.
pub fn resubmit_case(
    case: &CaseFacts,
    actor_id: i64,
    actor: &RoleSet,
) -> Result<CaseStatus, GateError> {
    if case.filed_by != actor_id && !actor.is_admin() {
        return Err(GateError::forbidden(
            "forbidden",
            "Only the person who filed this case can resubmit it",
        ));
    }
    if case.is_permanently_rejected() {
        return Err(GateError::invalid_state(
            "permanently_rejected",
            format!(
                "Resubmission is not possible: this case has been rejected {} times and is permanently dismissed",
                MAX_REJECTIONS
            ),
        ));
    }
    advance_case(case.status, CaseAction::Resubmit)
}

fn join_phrases(statuses: &[CaseStatus]) -> String {
    let phrases: Vec<&str> = statuses.iter().map(CaseStatus::phrase).collect();
    match phrases.len() {
        0 => "in a different stage".to_string(),
        1 => phrases[0].to_string(),
        n => format!("{} or {}", phrases[..n - 1].join(", "), phrases[n - 1]),
    }
}

fn wrong_stage(action: CaseAction, current: CaseStatus, allowed: &[CaseStatus]) -> GateError {
    GateError::invalid_state(
        "invalid_status",
        format!(
            "{} is not possible: the case is {}; it must be {}",
            action.title(),
            current.phrase(),
            join_phrases(allowed)
        ),
    )
}

/// Check that `action` may run at `current` without moving the case.
pub fn require_stage(current: CaseStatus, action: CaseAction) -> Result<(), GateError> {
    let (allowed, _) = action.rule();
    if allowed.contains(&current) {
        Ok(())
    } else {
        Err(wrong_stage(action, current, allowed))
    }
}

/// Status the case moves to when `action` runs at `current`.
/// Actions that do not move the case return `current`.
pub fn advance_case(current: CaseStatus, action: CaseAction) -> Result<CaseStatus, GateError> {
    require_stage(current, action)?;
    Ok(action.rule().1.unwrap_or(current))
}

/// Detective assignment opens the investigation the first time; later
/// reassignments leave the status alone.
pub fn assign_detective_status(current: CaseStatus) -> Result<CaseStatus, GateError> {
    use CaseStatus::*;
    match current {
        Open => Ok(UnderInvestigation),
        UnderInvestigation | SuspectsIdentified | ArrestApproved | Interrogation
        | TrialPending => Ok(current),
        _ => Err(wrong_stage(
            CaseAction::AssignDetective,
            current,
            &[Open, UnderInvestigation],
        )),
    }
}

/// Whether `actor_id` may edit the content of a case (title, description,
/// crime level, location). Administrators always can; the filer only while
/// the case is a draft or a rejected complaint that can still be resubmitted.
pub fn check_editable(case: &CaseFacts, actor_id: i64, actor: &RoleSet) -> Result<(), GateError> {
    if actor.is_admin() {
        return Ok(());
    }
    if case.filed_by != actor_id {
        return Err(GateError::forbidden(
            "forbidden",
            "Only the person who filed this case can edit it",
        ));
    }
    if case.is_permanently_rejected() {
        return Err(GateError::invalid_state(
            "permanently_rejected",
            "Editing is not possible: this case has been permanently dismissed",
        ));
    }
    if !matches!(case.status, CaseStatus::Draft | CaseStatus::Rejected) {
        return Err(GateError::invalid_state(
            "invalid_status",
            format!(
                "Editing is not possible: the case is {}; only drafts and rejected cases can be edited",
                case.status.phrase()
            ),
        ));
    }
    Ok(())
}

/// Whether a new co-complainant may join.
pub fn check_joinable(
    case: &CaseFacts,
    joinable: &[CaseStatus],
    allow_complaint_join: bool,
) -> Result<(), GateError> {
    if case.formation_type == FormationType::Complaint && !allow_complaint_join {
        return Err(GateError::invalid_state(
            "not_joinable",
            "Joining the case is not possible: complaint cases do not accept additional complainants",
        ));
    }
    if !joinable.contains(&case.status) {
        return Err(GateError::invalid_state(
            "not_joinable",
            format!(
                "{} is not possible: the case is {}; it must be {}",
                CaseAction::JoinCase.title(),
                case.status.phrase(),
                join_phrases(joinable)
            ),
        ));
    }
    Ok(())
}
