use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use noire_types::{
    advance_case, hierarchy, require_stage, AppError, BoardConnectionResponse, BoardContentType,
    BoardItem, BoardItemResponse, CaptainDecisionResponse, Case, CaseAction, ChiefReviewRequest,
    CreateBoardItemRequest, CreateBoardRequest, CreateCaptainDecisionRequest,
    CreateConnectionRequest, CreateInterrogationRequest, CreateSubmissionRequest,
    CreateSuspectRequest, DecisionStatus, DetectiveBoard, DetectiveBoardResponse, GuiltDecision,
    InterrogationResponse, InterrogationStatus, InvestigationListParams, ReviewDecision,
    ReviewSubmissionRequest, SubmissionStatus, SubmitRatingsRequest, SuspectResponse,
    SuspectStatus, SuspectSubmissionResponse, UpdateBoardItemRequest, UpdateSuspectRequest,
    WorkflowConfig,
};

use crate::auth::extractors::Actor;
use crate::error_convert::{SqlxErrorExt, ValidateRequest};
use crate::repo;
use crate::repo::decision::NewDecision;
use crate::repo::suspect::SuspectRow;
use crate::rest::case::stale_case_error;
use crate::visibility;

fn suspect_response(row: SuspectRow, workflow: &WorkflowConfig) -> SuspectResponse {
    SuspectResponse::build(row.suspect, row.crime_level, Utc::now(), workflow)
}

/// Move the case inside `tx` if `next` differs from where it is; a lost
/// race re-runs the stage check on the fresh case.
async fn move_case(
    pool: &Pool<Sqlite>,
    tx: &mut sqlx::SqliteConnection,
    case: &Case,
    next: noire_types::CaseStatus,
    action: CaseAction,
) -> Result<(), AppError> {
    if next == case.status {
        return Ok(());
    }
    let moved = repo::case::transition(
        tx,
        case.id,
        (case.status, case.rejection_count),
        (next, case.rejection_count),
    )
    .await?;
    if moved {
        tracing::info!(
            case_id = case.id,
            from = case.status.as_str(),
            to = next.as_str(),
            action = action.title(),
            "case advanced"
        );
        Ok(())
    } else {
        Err(stale_case_error(pool, case.id, |fresh| {
            advance_case(fresh.status, action)
                .map(|_| ())
                .map_err(AppError::from)
        })
        .await)
    }
}

// ── Detective boards ───────────────────────────────────────────────

async fn board_response(
    pool: &Pool<Sqlite>,
    board: DetectiveBoard,
) -> Result<DetectiveBoardResponse, AppError> {
    let items = repo::board::items(pool, board.id).await?;
    let connections = repo::board::connections(pool, board.id).await?;
    Ok(DetectiveBoardResponse::new(board, items, connections))
}

/// A board and its case, if the actor may see them.
async fn visible_board(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    board_id: i64,
) -> Result<(DetectiveBoard, Case), AppError> {
    let not_found = || AppError::not_found(format!("Detective board {board_id} not found"));
    let board = repo::board::find_by_id(pool, board_id)
        .await?
        .ok_or_else(not_found)?;
    let case = visibility::load_investigable_case(pool, actor, board.case_id)
        .await
        .map_err(|_| not_found())?;
    Ok((board, case))
}

async fn visible_item(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    item_id: i64,
) -> Result<BoardItem, AppError> {
    let not_found = || AppError::not_found(format!("Board item {item_id} not found"));
    let item = repo::board::find_item(pool, item_id)
        .await?
        .ok_or_else(not_found)?;
    visible_board(pool, actor, item.board_id)
        .await
        .map_err(|_| not_found())?;
    Ok(item)
}

/// GET /api/investigation/detective-boards
#[utoipa::path(
    get,
    path = "/api/investigation/detective-boards",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Boards visible to the caller", body = Vec<DetectiveBoardResponse>)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_boards(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<DetectiveBoardResponse>>, AppError> {
    let boards =
        repo::board::list(&pool, params.case, visibility::investigation_scope(&actor)).await?;
    let mut out = Vec::with_capacity(boards.len());
    for board in boards {
        out.push(board_response(&pool, board).await?);
    }
    Ok(Json(out))
}

/// POST /api/investigation/detective-boards
///
/// Idempotent: the first call for a case creates the board (201), later
/// calls return the same board (200).
#[utoipa::path(
    post,
    path = "/api/investigation/detective-boards",
    request_body = CreateBoardRequest,
    responses(
        (status = 201, description = "Board created", body = DetectiveBoardResponse),
        (status = 200, description = "Board already existed", body = DetectiveBoardResponse),
        (status = 400, description = "Case not yet open", body = AppError),
        (status = 404, description = "Case not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_board(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateBoardRequest>,
) -> Result<(StatusCode, Json<DetectiveBoardResponse>), AppError> {
    let case = visibility::load_investigable_case(&pool, &actor, body.case).await?;
    require_stage(case.status, CaseAction::CreateBoard)?;

    let (board, created) = repo::board::get_or_create(&pool, case.id, actor.id).await?;
    let status = if created {
        tracing::info!(board_id = board.id, case_id = case.id, "detective board opened");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(board_response(&pool, board).await?)))
}

/// GET /api/investigation/detective-boards/{id}
#[utoipa::path(
    get,
    path = "/api/investigation/detective-boards/{id}",
    params(("id" = i64, Path, description = "Board ID")),
    responses(
        (status = 200, description = "Board with items and connections", body = DetectiveBoardResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_board(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<DetectiveBoardResponse>, AppError> {
    let (board, _) = visible_board(&pool, &actor, id).await?;
    Ok(Json(board_response(&pool, board).await?))
}

/// POST /api/investigation/board-items
#[utoipa::path(
    post,
    path = "/api/investigation/board-items",
    request_body = CreateBoardItemRequest,
    responses(
        (status = 201, description = "Item pinned", body = BoardItemResponse),
        (status = 404, description = "Board not found", body = AppError),
        (status = 422, description = "Invalid link", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_board_item(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateBoardItemRequest>,
) -> Result<(StatusCode, Json<BoardItemResponse>), AppError> {
    body.validate_request()?;
    let link = body.link()?;
    let (board, case) = visible_board(&pool, &actor, body.board).await?;

    if let Some((kind, object_id)) = link {
        if !repo::board::link_belongs_to_case(&pool, kind, object_id, case.id).await? {
            let noun = match kind {
                BoardContentType::Evidence => "evidence",
                BoardContentType::Suspect => "suspect",
            };
            return Err(AppError::field(
                "object_id",
                format!("No {noun} {object_id} exists on this case"),
            ));
        }
    }

    let item = repo::board::create_item(&pool, &body, link).await?;
    tracing::debug!(item_id = item.id, board_id = board.id, "board item pinned");
    Ok((StatusCode::CREATED, Json(BoardItemResponse::from(item))))
}

/// PATCH /api/investigation/board-items/{id}
#[utoipa::path(
    patch,
    path = "/api/investigation/board-items/{id}",
    request_body = UpdateBoardItemRequest,
    params(("id" = i64, Path, description = "Board item ID")),
    responses(
        (status = 200, description = "Item updated", body = BoardItemResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_board_item(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBoardItemRequest>,
) -> Result<Json<BoardItemResponse>, AppError> {
    let item = visible_item(&pool, &actor, id).await?;
    let item = repo::board::update_item(&pool, &item, &body).await?;
    Ok(Json(BoardItemResponse::from(item)))
}

/// DELETE /api/investigation/board-items/{id}
#[utoipa::path(
    delete,
    path = "/api/investigation/board-items/{id}",
    params(("id" = i64, Path, description = "Board item ID")),
    responses(
        (status = 204, description = "Item removed"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_board_item(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let item = visible_item(&pool, &actor, id).await?;
    repo::board::delete_item(&pool, &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/investigation/board-connections
#[utoipa::path(
    post,
    path = "/api/investigation/board-connections",
    request_body = CreateConnectionRequest,
    responses(
        (status = 201, description = "Items connected", body = BoardConnectionResponse),
        (status = 404, description = "Item not found", body = AppError),
        (status = 409, description = "Already connected", body = AppError),
        (status = 422, description = "Invalid connection", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_connection(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<BoardConnectionResponse>), AppError> {
    if body.from_item == body.to_item {
        return Err(AppError::non_field("An item cannot be connected to itself"));
    }
    let from = visible_item(&pool, &actor, body.from_item).await?;
    let to = visible_item(&pool, &actor, body.to_item).await?;
    if from.board_id != to.board_id {
        return Err(AppError::non_field("Both items must be on the same board"));
    }
    if repo::board::connected(&pool, from.id, to.id).await? {
        return Err(AppError::conflict("These items are already connected"));
    }

    let connection = repo::board::create_connection(
        &pool,
        from.board_id,
        from.id,
        to.id,
        body.note.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(BoardConnectionResponse::from(connection))))
}

/// DELETE /api/investigation/board-connections/{id}
#[utoipa::path(
    delete,
    path = "/api/investigation/board-connections/{id}",
    params(("id" = i64, Path, description = "Connection ID")),
    responses(
        (status = 204, description = "Connection removed"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn delete_connection(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let not_found = || AppError::not_found(format!("Board connection {id} not found"));
    let connection = repo::board::find_connection(&pool, id)
        .await?
        .ok_or_else(not_found)?;
    visible_board(&pool, &actor, connection.board_id)
        .await
        .map_err(|_| not_found())?;
    repo::board::delete_connection(&pool, &connection).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Suspects ───────────────────────────────────────────────────────

async fn visible_suspect(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: i64,
) -> Result<(SuspectRow, Case), AppError> {
    let not_found = || AppError::not_found(format!("Suspect {id} not found"));
    let row = repo::suspect::find_by_id(pool, id)
        .await?
        .ok_or_else(not_found)?;
    let case = visibility::load_investigable_case(pool, actor, row.suspect.case_id)
        .await
        .map_err(|_| not_found())?;
    Ok((row, case))
}

/// GET /api/investigation/suspects
#[utoipa::path(
    get,
    path = "/api/investigation/suspects",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Suspects visible to the caller", body = Vec<SuspectResponse>)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn list_suspects(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<SuspectResponse>>, AppError> {
    let rows =
        repo::suspect::list(&pool, params.case, visibility::investigation_scope(&actor)).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| suspect_response(row, &workflow))
            .collect(),
    ))
}

/// POST /api/investigation/suspects
#[utoipa::path(
    post,
    path = "/api/investigation/suspects",
    request_body = CreateSuspectRequest,
    responses(
        (status = 201, description = "Suspect added", body = SuspectResponse),
        (status = 400, description = "Case not under investigation", body = AppError),
        (status = 403, description = "Detective rank required", body = AppError),
        (status = 409, description = "Person already a suspect on this case", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn create_suspect(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Json(body): Json<CreateSuspectRequest>,
) -> Result<(StatusCode, Json<SuspectResponse>), AppError> {
    actor.require(hierarchy::DETECTIVE, CaseAction::CreateSuspect.title())?;
    body.validate_request()?;
    let case = visibility::load_investigable_case(&pool, &actor, body.case).await?;
    require_stage(case.status, CaseAction::CreateSuspect)?;

    let person = repo::user::find_by_id(&pool, body.person)
        .await?
        .ok_or_else(|| AppError::field("person", format!("User {} does not exist", body.person)))?;
    let full_name = body
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&person.display_name);

    let id =
        repo::suspect::create(&pool, case.id, person.id, full_name, &body.reason, actor.id).await?;
    let row = repo::suspect::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Suspect vanished after insert"))?;

    tracing::info!(suspect_id = id, case_id = case.id, person_id = person.id, "suspect added");
    Ok((StatusCode::CREATED, Json(suspect_response(row, &workflow))))
}

/// GET /api/investigation/suspects/{id}
#[utoipa::path(
    get,
    path = "/api/investigation/suspects/{id}",
    params(("id" = i64, Path, description = "Suspect ID")),
    responses(
        (status = 200, description = "Suspect found", body = SuspectResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn get_suspect(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<SuspectResponse>, AppError> {
    let (row, _) = visible_suspect(&pool, &actor, id).await?;
    Ok(Json(suspect_response(row, &workflow)))
}

/// PATCH /api/investigation/suspects/{id}
#[utoipa::path(
    patch,
    path = "/api/investigation/suspects/{id}",
    request_body = UpdateSuspectRequest,
    params(("id" = i64, Path, description = "Suspect ID")),
    responses(
        (status = 200, description = "Suspect updated", body = SuspectResponse),
        (status = 400, description = "Status cannot change now", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 422, description = "Status not settable by hand", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn update_suspect(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateSuspectRequest>,
) -> Result<Json<SuspectResponse>, AppError> {
    actor.require(hierarchy::DETECTIVE, "Editing a suspect")?;
    let (row, _) = visible_suspect(&pool, &actor, id).await?;

    if let Some(status) = body.status {
        if !status.is_manually_settable() {
            return Err(AppError::field(
                "status",
                "Arrests, convictions and bail set this status; it cannot be set by hand",
            ));
        }
        if !row.suspect.status.is_wanted() {
            return Err(AppError::bad_request(
                "The status can only be changed while the suspect is wanted",
            )
            .with_code("invalid_status"));
        }
    }

    repo::suspect::update(&pool, id, &body).await?;
    let row = repo::suspect::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Suspect {id} not found")))?;
    Ok(Json(suspect_response(row, &workflow)))
}

/// POST /api/investigation/suspects/{id}/arrest
#[utoipa::path(
    post,
    path = "/api/investigation/suspects/{id}/arrest",
    params(("id" = i64, Path, description = "Suspect ID")),
    responses(
        (status = 200, description = "Suspect arrested", body = SuspectResponse),
        (status = 400, description = "No warrant, or suspect not wanted", body = AppError),
        (status = 403, description = "Officer rank required", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn arrest_suspect(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<SuspectResponse>, AppError> {
    actor.require(hierarchy::OFFICER, "Arresting a suspect")?;
    let row = repo::suspect::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Suspect {id} not found")))?;

    if !row.suspect.arrest_warrant {
        return Err(
            AppError::bad_request("No arrest warrant has been issued for this suspect")
                .with_code("no_warrant"),
        );
    }
    if !row.suspect.status.is_wanted() || !repo::suspect::arrest(&pool, id).await? {
        return Err(AppError::bad_request("This suspect is no longer wanted")
            .with_code("invalid_status"));
    }

    tracing::info!(suspect_id = id, officer_id = actor.id, "suspect arrested");
    let row = repo::suspect::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Suspect {id} not found")))?;
    Ok(Json(suspect_response(row, &workflow)))
}

// ── Suspect submissions ────────────────────────────────────────────

async fn submission_response(
    pool: &Pool<Sqlite>,
    id: i64,
) -> Result<SuspectSubmissionResponse, AppError> {
    let submission = repo::submission::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Suspect submission {id} not found")))?;
    let suspects = repo::submission::suspect_ids(pool, id).await?;
    Ok(SuspectSubmissionResponse::new(submission, suspects))
}

/// GET /api/investigation/suspect-submissions
#[utoipa::path(
    get,
    path = "/api/investigation/suspect-submissions",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Submissions visible to the caller", body = Vec<SuspectSubmissionResponse>)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_submissions(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<SuspectSubmissionResponse>>, AppError> {
    let submissions =
        repo::submission::list(&pool, params.case, visibility::investigation_scope(&actor))
            .await?;
    let mut out = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let suspects = repo::submission::suspect_ids(&pool, submission.id).await?;
        out.push(SuspectSubmissionResponse::new(submission, suspects));
    }
    Ok(Json(out))
}

/// POST /api/investigation/suspect-submissions
#[utoipa::path(
    post,
    path = "/api/investigation/suspect-submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Suspects submitted for approval", body = SuspectSubmissionResponse),
        (status = 400, description = "Case not under investigation", body = AppError),
        (status = 409, description = "A submission is already pending", body = AppError),
        (status = 422, description = "Unknown or unwanted suspects", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_submission(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<SuspectSubmissionResponse>), AppError> {
    actor.require(hierarchy::DETECTIVE, CaseAction::SubmitSuspects.title())?;
    body.validate_request()?;
    let case = visibility::load_investigable_case(&pool, &actor, body.case).await?;
    let next = advance_case(case.status, CaseAction::SubmitSuspects)?;

    let mut requested = body.suspects.clone();
    requested.sort_unstable();
    requested.dedup();
    let wanted = repo::suspect::wanted_in_case(&pool, case.id, &requested).await?;
    if wanted.len() != requested.len() {
        let missing: Vec<String> = requested
            .iter()
            .filter(|id| !wanted.contains(id))
            .map(i64::to_string)
            .collect();
        return Err(AppError::field(
            "suspects",
            format!(
                "Not wanted suspects of this case: {}",
                missing.join(", ")
            ),
        ));
    }

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let id = repo::submission::create(&mut tx, case.id, actor.id, &body.reasoning, &wanted)
        .await?
        .ok_or_else(|| {
            AppError::conflict("This case already has a suspect submission awaiting review")
        })?;
    move_case(&pool, &mut tx, &case, next, CaseAction::SubmitSuspects).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(submission_id = id, case_id = case.id, suspects = ?wanted, "suspects submitted");
    Ok((StatusCode::CREATED, Json(submission_response(&pool, id).await?)))
}

/// POST /api/investigation/suspect-submissions/{id}/review
#[utoipa::path(
    post,
    path = "/api/investigation/suspect-submissions/{id}/review",
    request_body = ReviewSubmissionRequest,
    params(("id" = i64, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission reviewed", body = SuspectSubmissionResponse),
        (status = 403, description = "Sergeant rank required", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Already reviewed", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn review_submission(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<ReviewSubmissionRequest>,
) -> Result<Json<SuspectSubmissionResponse>, AppError> {
    actor.require(hierarchy::SERGEANT, "Reviewing a suspect submission")?;
    body.check()?;

    let submission = repo::submission::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Suspect submission {id} not found")))?;
    if submission.status != SubmissionStatus::Pending {
        return Err(AppError::conflict("This submission has already been reviewed"));
    }
    let case = visibility::load_investigable_case(&pool, &actor, submission.case_id).await?;

    let (action, status) = match body.decision {
        ReviewDecision::Approved => (CaseAction::ApproveSuspects, SubmissionStatus::Approved),
        ReviewDecision::Rejected => (CaseAction::RejectSuspects, SubmissionStatus::Rejected),
    };
    let next = advance_case(case.status, action)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let reviewed = repo::submission::review(
        &mut tx,
        id,
        status,
        body.review_notes.as_deref(),
        actor.id,
    )
    .await?;
    if !reviewed {
        return Err(AppError::conflict("This submission has already been reviewed"));
    }
    move_case(&pool, &mut tx, &case, next, action).await?;
    if status == SubmissionStatus::Approved {
        repo::suspect::approve_submitted(&mut *tx, id).await?;
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        submission_id = id,
        case_id = case.id,
        decision = ?body.decision,
        sergeant_id = actor.id,
        "suspect submission reviewed"
    );
    Ok(Json(submission_response(&pool, id).await?))
}

// ── Interrogations ─────────────────────────────────────────────────

/// The detective is the caller when they are a detective, else the case's
/// assigned detective. The sergeant is the case's assigned sergeant, else
/// the caller when they hold sergeant rank.
fn interrogation_parties(actor: &Actor, case: &Case) -> Result<(i64, i64), AppError> {
    let detective = if actor.hierarchy() == hierarchy::DETECTIVE {
        Some(actor.id)
    } else {
        case.assigned_detective_id
    };
    let sergeant = case
        .assigned_sergeant_id
        .or_else(|| actor.at_least(hierarchy::SERGEANT).then_some(actor.id));

    let detective = detective.ok_or_else(|| {
        AppError::bad_request("An interrogation needs a detective; assign one to the case first")
            .with_code("missing_detective")
    })?;
    let sergeant = sergeant.ok_or_else(|| {
        AppError::bad_request("An interrogation needs a sergeant; assign one to the case first")
            .with_code("missing_sergeant")
    })?;
    if detective == sergeant {
        return Err(AppError::bad_request(
            "The detective and the sergeant of an interrogation must be different people",
        )
        .with_code("same_interrogators"));
    }
    Ok((detective, sergeant))
}

async fn visible_interrogation(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: i64,
) -> Result<noire_types::Interrogation, AppError> {
    let not_found = || AppError::not_found(format!("Interrogation {id} not found"));
    let interrogation = repo::interrogation::find_by_id(pool, id)
        .await?
        .ok_or_else(not_found)?;
    let party = interrogation.detective_id == actor.id || interrogation.sergeant_id == actor.id;
    if !party {
        visibility::load_investigable_case(pool, actor, interrogation.case_id)
            .await
            .map_err(|_| not_found())?;
    }
    Ok(interrogation)
}

/// GET /api/investigation/interrogations
#[utoipa::path(
    get,
    path = "/api/investigation/interrogations",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Interrogations visible to the caller", body = Vec<InterrogationResponse>)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_interrogations(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<InterrogationResponse>>, AppError> {
    let rows =
        repo::interrogation::list(&pool, params.case, visibility::investigation_scope(&actor))
            .await?;
    Ok(Json(rows.into_iter().map(InterrogationResponse::from).collect()))
}

/// POST /api/investigation/interrogations
#[utoipa::path(
    post,
    path = "/api/investigation/interrogations",
    request_body = CreateInterrogationRequest,
    responses(
        (status = 201, description = "Interrogation started", body = InterrogationResponse),
        (status = 400, description = "Suspect not approved or case in wrong stage", body = AppError),
        (status = 403, description = "Detective rank required", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_interrogation(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateInterrogationRequest>,
) -> Result<(StatusCode, Json<InterrogationResponse>), AppError> {
    actor.require(hierarchy::DETECTIVE, CaseAction::CreateInterrogation.title())?;
    let (row, case) = visible_suspect(&pool, &actor, body.suspect).await?;

    if !row.suspect.sergeant_approved {
        return Err(AppError::bad_request(
            "This suspect has not been approved for arrest by a sergeant",
        )
        .with_code("not_approved"));
    }
    let next = advance_case(case.status, CaseAction::CreateInterrogation)?;
    let (detective, sergeant) = interrogation_parties(&actor, &case)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let id = repo::interrogation::create(&mut tx, case.id, row.suspect.id, detective, sergeant)
        .await?;
    move_case(&pool, &mut tx, &case, next, CaseAction::CreateInterrogation).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        interrogation_id = id,
        case_id = case.id,
        suspect_id = row.suspect.id,
        detective_id = detective,
        sergeant_id = sergeant,
        "interrogation started"
    );
    let interrogation = repo::interrogation::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Interrogation vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(InterrogationResponse::from(interrogation))))
}

/// GET /api/investigation/interrogations/{id}
#[utoipa::path(
    get,
    path = "/api/investigation/interrogations/{id}",
    params(("id" = i64, Path, description = "Interrogation ID")),
    responses(
        (status = 200, description = "Interrogation found", body = InterrogationResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_interrogation(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<InterrogationResponse>, AppError> {
    let interrogation = visible_interrogation(&pool, &actor, id).await?;
    Ok(Json(InterrogationResponse::from(interrogation)))
}

/// POST /api/investigation/interrogations/{id}/submit_ratings
#[utoipa::path(
    post,
    path = "/api/investigation/interrogations/{id}/submit_ratings",
    request_body = SubmitRatingsRequest,
    params(("id" = i64, Path, description = "Interrogation ID")),
    responses(
        (status = 200, description = "Rating recorded", body = InterrogationResponse),
        (status = 403, description = "Not a party to the interrogation", body = AppError),
        (status = 409, description = "Rating already submitted", body = AppError),
        (status = 422, description = "Rating out of range", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn submit_ratings(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<SubmitRatingsRequest>,
) -> Result<Json<InterrogationResponse>, AppError> {
    body.validate_request()?;
    let interrogation = visible_interrogation(&pool, &actor, id).await?;
    let side = interrogation.rating_side(actor.id)?;

    let stored = repo::interrogation::submit_rating(
        &pool,
        id,
        side,
        body.rating,
        body.notes.as_deref(),
    )
    .await?;
    if !stored {
        return Err(AppError::conflict(format!(
            "The {} rating for this interrogation has already been submitted",
            side.column_prefix()
        )));
    }

    let interrogation = repo::interrogation::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Interrogation {id} not found")))?;
    tracing::info!(
        interrogation_id = id,
        side = side.column_prefix(),
        status = ?interrogation.status,
        "interrogation rating recorded"
    );
    Ok(Json(InterrogationResponse::from(interrogation)))
}

// ── Captain decisions ──────────────────────────────────────────────

/// GET /api/investigation/captain-decisions
#[utoipa::path(
    get,
    path = "/api/investigation/captain-decisions",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Decisions visible to the caller", body = Vec<CaptainDecisionResponse>)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_decisions(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<CaptainDecisionResponse>>, AppError> {
    let rows =
        repo::decision::list(&pool, params.case, visibility::investigation_scope(&actor)).await?;
    Ok(Json(rows.into_iter().map(CaptainDecisionResponse::from).collect()))
}

/// POST /api/investigation/captain-decisions
#[utoipa::path(
    post,
    path = "/api/investigation/captain-decisions",
    request_body = CreateCaptainDecisionRequest,
    responses(
        (status = 201, description = "Decision recorded", body = CaptainDecisionResponse),
        (status = 400, description = "Interrogation not yet submitted", body = AppError),
        (status = 403, description = "Captain rank required", body = AppError),
        (status = 409, description = "Interrogation already decided", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_decision(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateCaptainDecisionRequest>,
) -> Result<(StatusCode, Json<CaptainDecisionResponse>), AppError> {
    actor.require(hierarchy::CAPTAIN, CaseAction::DecideGuilt.title())?;
    body.validate_request()?;

    let interrogation = repo::interrogation::find_by_id(&pool, body.interrogation)
        .await?
        .ok_or_else(|| {
            AppError::not_found(format!("Interrogation {} not found", body.interrogation))
        })?;
    if interrogation.status != InterrogationStatus::Submitted {
        return Err(AppError::bad_request(
            "Both the detective and the sergeant must submit their ratings first",
        )
        .with_code("interrogation_pending"));
    }
    let case = visibility::load_investigable_case(&pool, &actor, interrogation.case_id).await?;
    require_stage(case.status, CaseAction::DecideGuilt)?;

    let status = DecisionStatus::initial(body.decision, case.crime_level);

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let id = repo::decision::create(
        &mut tx,
        NewDecision {
            interrogation_id: interrogation.id,
            case_id: case.id,
            suspect_id: interrogation.suspect_id,
            captain_id: actor.id,
            decision: body.decision,
            reasoning: &body.reasoning,
            status,
        },
    )
    .await?;
    if body.decision == GuiltDecision::NotGuilty {
        repo::suspect::set_status(&mut *tx, interrogation.suspect_id, SuspectStatus::Cleared)
            .await?;
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        decision_id = id,
        case_id = case.id,
        decision = ?body.decision,
        status = ?status,
        "captain decision recorded"
    );
    let decision = repo::decision::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Decision vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(CaptainDecisionResponse::from(decision))))
}

/// POST /api/investigation/captain-decisions/{id}/chief_review
#[utoipa::path(
    post,
    path = "/api/investigation/captain-decisions/{id}/chief_review",
    request_body = ChiefReviewRequest,
    params(("id" = i64, Path, description = "Captain decision ID")),
    responses(
        (status = 200, description = "Chief ruling recorded", body = CaptainDecisionResponse),
        (status = 400, description = "Decision not awaiting the chief", body = AppError),
        (status = 403, description = "Chief rank required", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "investigation"
)]
#[tracing::instrument(skip(pool))]
pub async fn chief_review(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<ChiefReviewRequest>,
) -> Result<Json<CaptainDecisionResponse>, AppError> {
    actor.require(hierarchy::CHIEF, "Reviewing a captain's decision")?;
    let decision = repo::decision::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Captain decision {id} not found")))?;

    let not_awaiting = || {
        AppError::bad_request("This decision is not awaiting the chief's review")
            .with_code("not_awaiting_chief")
    };
    if decision.status != DecisionStatus::AwaitingChief {
        return Err(not_awaiting());
    }

    let status = match body.decision {
        ReviewDecision::Approved => DecisionStatus::ChiefApproved,
        ReviewDecision::Rejected => DecisionStatus::ChiefRejected,
    };
    if !repo::decision::chief_review(&pool, id, status, actor.id, body.notes.as_deref()).await? {
        return Err(not_awaiting());
    }

    tracing::info!(decision_id = id, status = ?status, chief_id = actor.id, "chief reviewed decision");
    let decision = repo::decision::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Captain decision {id} not found")))?;
    Ok(Json(CaptainDecisionResponse::from(decision)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use noire_types::{CaseStatus, FormationType, RoleSet};

    fn actor(id: i64, role: &str) -> Actor {
        Actor {
            id,
            email: format!("{role}@lapd.gov"),
            roles: RoleSet::from_names([role]),
        }
    }

    fn case(detective: Option<i64>, sergeant: Option<i64>) -> Case {
        let now = Utc::now();
        Case {
            id: 1,
            case_number: "LA-2026-000100".into(),
            title: "The Golden Butterfly".into(),
            description: String::new(),
            formation_type: FormationType::CrimeScene,
            status: CaseStatus::ArrestApproved,
            crime_level_id: 2,
            crime_level: 1,
            crime_level_name: "Major".into(),
            rejection_count: 0,
            filed_by: 9,
            filed_by_hierarchy: 2,
            assigned_detective_id: detective,
            assigned_sergeant_id: sergeant,
            crime_scene_location: Some("Bunker Hill".into()),
            crime_scene_datetime: Some(now),
            opened_at: Some(now),
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn detective_caller_pairs_with_assigned_sergeant() {
        let parties = interrogation_parties(&actor(3, "detective"), &case(Some(7), Some(4)));
        assert_eq!(parties.unwrap(), (3, 4));
    }

    #[test]
    fn sergeant_caller_fills_in_for_missing_sergeant() {
        let parties = interrogation_parties(&actor(5, "sergeant"), &case(Some(7), None));
        assert_eq!(parties.unwrap(), (7, 5));
    }

    #[test]
    fn missing_detective_is_reported() {
        let err = interrogation_parties(&actor(5, "sergeant"), &case(None, Some(4))).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("missing_detective"));
    }

    #[test]
    fn same_person_cannot_hold_both_seats() {
        let err = interrogation_parties(&actor(5, "captain"), &case(Some(5), None)).unwrap_err();
        assert_eq!(err.code.as_deref(), Some("same_interrogators"));
    }
}
