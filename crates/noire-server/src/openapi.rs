use axum::Router;
use noire_types::{
    // Errors & auth
    AppError, AppErrorKind, LoginRequest, LoginResponse, RegisterRequest, Role, SetRolesRequest,
    UserResponse,
    // Cases
    CaseDetailResponse, CaseListResponse, CaseResponse, CaseStatus, ComplainantResponse,
    CreateCaseRequest, CrimeLevelResponse, FormationType, JoinCaseRequest, PublicCaseResponse,
    ReviewCaseRequest, ReviewDecision, ReviewResponse, ReviewStage, UpdateCaseRequest,
    WitnessInput, WitnessResponse,
    // Evidence
    CreateEvidenceRequest, EvidenceResponse, EvidenceType,
    // Investigation
    BoardConnectionResponse, BoardContentType, BoardItemResponse, CaptainDecisionResponse,
    ChiefReviewRequest, CreateBoardItemRequest, CreateBoardRequest, CreateCaptainDecisionRequest,
    CreateConnectionRequest, CreateInterrogationRequest, CreateSubmissionRequest,
    CreateSuspectRequest, DecisionStatus, DetectiveBoardResponse, GuiltDecision,
    InterrogationResponse, InterrogationStatus, ReviewSubmissionRequest, SubmissionStatus,
    SubmitRatingsRequest, SuspectResponse, SuspectStatus, SuspectSubmissionResponse,
    UpdateBoardItemRequest, UpdateSuspectRequest,
    // Trial
    BailResponse, BailStatus, CreateBailRequest, CreateTrialRequest, TrialResponse, Verdict,
    VerdictRequest,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::db::AppState;
use crate::health;
use crate::rest;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        // Auth & users
        rest::auth::register,
        rest::auth::login,
        rest::auth::me,
        rest::auth::list_users,
        rest::auth::set_roles,
        // Cases
        rest::case::list_crime_levels,
        rest::case::create_case,
        rest::case::list_cases,
        rest::case::list_public_cases,
        rest::case::get_case,
        rest::case::update_case,
        rest::case::cadet_review,
        rest::case::officer_review,
        rest::case::resubmit,
        rest::case::join_case,
        // Evidence
        rest::evidence::create_evidence,
        rest::evidence::list_evidence,
        rest::evidence::get_evidence,
        // Investigation
        rest::investigation::list_boards,
        rest::investigation::create_board,
        rest::investigation::get_board,
        rest::investigation::create_board_item,
        rest::investigation::update_board_item,
        rest::investigation::delete_board_item,
        rest::investigation::create_connection,
        rest::investigation::delete_connection,
        rest::investigation::list_suspects,
        rest::investigation::create_suspect,
        rest::investigation::get_suspect,
        rest::investigation::update_suspect,
        rest::investigation::arrest_suspect,
        rest::investigation::list_submissions,
        rest::investigation::create_submission,
        rest::investigation::review_submission,
        rest::investigation::list_interrogations,
        rest::investigation::create_interrogation,
        rest::investigation::get_interrogation,
        rest::investigation::submit_ratings,
        rest::investigation::list_decisions,
        rest::investigation::create_decision,
        rest::investigation::chief_review,
        // Trial
        rest::trial::list_trials,
        rest::trial::create_trial,
        rest::trial::get_trial,
        rest::trial::record_verdict,
        rest::trial::create_bail,
        rest::trial::pay_bail,
    ),
    components(schemas(
        health::HealthResponse, health::DatabaseHealth,
        AppError, AppErrorKind,
        LoginRequest, LoginResponse, RegisterRequest, Role, SetRolesRequest, UserResponse,
        CaseDetailResponse, CaseListResponse, CaseResponse, CaseStatus, ComplainantResponse,
        CreateCaseRequest, CrimeLevelResponse, FormationType, JoinCaseRequest, PublicCaseResponse,
        ReviewCaseRequest, ReviewDecision, ReviewResponse, ReviewStage, UpdateCaseRequest,
        WitnessInput, WitnessResponse,
        CreateEvidenceRequest, EvidenceResponse, EvidenceType,
        BoardConnectionResponse, BoardContentType, BoardItemResponse, CaptainDecisionResponse,
        ChiefReviewRequest, CreateBoardItemRequest, CreateBoardRequest,
        CreateCaptainDecisionRequest, CreateConnectionRequest, CreateInterrogationRequest,
        CreateSubmissionRequest, CreateSuspectRequest, DecisionStatus, DetectiveBoardResponse,
        GuiltDecision, InterrogationResponse, InterrogationStatus, ReviewSubmissionRequest,
        SubmissionStatus, SubmitRatingsRequest, SuspectResponse, SuspectStatus,
        SuspectSubmissionResponse, UpdateBoardItemRequest, UpdateSuspectRequest,
        BailResponse, BailStatus, CreateBailRequest, CreateTrialRequest, TrialResponse, Verdict,
        VerdictRequest,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Registration, login and the current user"),
        (name = "users", description = "User directory and role management"),
        (name = "cases", description = "Case intake, review and lifecycle"),
        (name = "evidence", description = "Evidence recorded against cases"),
        (name = "investigation", description = "Detective boards, suspects, interrogations and captain decisions"),
        (name = "trial", description = "Trials, verdicts and bail"),
    ),
    info(
        title = "LA Noire NextGen API",
        description = "Case lifecycle and review engine for the police department",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;

/// Build the API router with the given state, health check and docs UI.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(rest::api_router())
        .route("/health", axum::routing::get(health::health_check))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
}

/// The API router wrapped in the per-request layers: bearer auth, body
/// size limit and `x-request-id` tagging.
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    let auth = state.auth.clone();
    api_router(state)
        .layer(axum::extract::DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            crate::auth::middleware::auth_middleware,
        ))
        .layer(tower_http::request_id::PropagateRequestIdLayer::x_request_id())
        .layer(tower_http::request_id::SetRequestIdLayer::x_request_id(
            tower_http::request_id::MakeRequestUuid,
        ))
}
