use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

use noire_types::{
    assign_detective_status, check_editable, check_joinable, hierarchy, resubmit_case,
    review_case, route_new_case, AppError, Case, CaseDetailResponse, CaseListParams,
    CaseListResponse, CaseResponse, ComplainantResponse, CreateCaseRequest, CrimeLevelResponse,
    FormationType, JoinCaseRequest, PublicCaseResponse, ReviewCaseRequest, ReviewResponse,
    ReviewStage, UpdateCaseRequest, WitnessResponse, WorkflowConfig,
};

use crate::auth::extractors::Actor;
use crate::error_convert::{SqlxErrorExt, ValidateRequest};
use crate::repo;
use crate::repo::case::NewCase;
use crate::repo::review::Reviewer;
use crate::visibility;

/// Assemble the detail view of a case.
async fn case_detail(pool: &Pool<Sqlite>, case: Case) -> Result<CaseDetailResponse, AppError> {
    let complainants = repo::complainant::list_by_case(pool, case.id).await?;
    let witnesses = repo::case::list_witnesses(pool, case.id).await?;
    let reviews = repo::review::list_by_case(pool, case.id).await?;
    Ok(CaseDetailResponse {
        case: CaseResponse::from(case),
        complainants: complainants.into_iter().map(ComplainantResponse::from).collect(),
        witnesses: witnesses.into_iter().map(WitnessResponse::from).collect(),
        reviews: reviews.into_iter().map(ReviewResponse::from).collect(),
    })
}

/// Error for a conditional transition that matched no row: somebody moved
/// the case first. Re-run the caller's gate against the fresh case so the
/// loser sees the same error a later request would; fall back to 409.
pub(crate) async fn stale_case_error<F>(pool: &Pool<Sqlite>, id: i64, gate: F) -> AppError
where
    F: FnOnce(&Case) -> Result<(), AppError>,
{
    match repo::case::find_by_id(pool, id).await {
        Ok(Some(fresh)) => match gate(&fresh) {
            Err(e) => e,
            Ok(()) => AppError::conflict("The case was changed by another request; try again"),
        },
        Ok(None) => AppError::not_found(format!("Case {id} not found")),
        Err(e) => e,
    }
}

async fn require_crime_level(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    match repo::crime_level::find_by_id(pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::field("crime_level", format!("Unknown crime level {id}"))),
    }
}

// ── Crime levels ───────────────────────────────────────────────────

/// GET /api/crime-levels
#[utoipa::path(
    get,
    path = "/api/crime-levels",
    responses(
        (status = 200, description = "Crime levels, most severe first", body = Vec<CrimeLevelResponse>)
    ),
    tag = "cases"
)]
pub async fn list_crime_levels(
    State(pool): State<Pool<Sqlite>>,
) -> Result<Json<Vec<CrimeLevelResponse>>, AppError> {
    let levels = repo::crime_level::list(&pool).await?;
    Ok(Json(levels.into_iter().map(CrimeLevelResponse::from).collect()))
}

// ── Cases ──────────────────────────────────────────────────────────

/// POST /api/cases
#[utoipa::path(
    post,
    path = "/api/cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case filed", body = CaseDetailResponse),
        (status = 403, description = "Rank too low for this formation type", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, body), fields(formation = ?body.formation_type))]
pub async fn create_case(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateCaseRequest>,
) -> Result<(StatusCode, Json<CaseDetailResponse>), AppError> {
    body.validate_request()?;
    let status = route_new_case(body.formation_type, &actor.roles, body.save_as_draft)?;
    body.check_formation_fields(Utc::now())?;
    require_crime_level(&pool, body.crime_level).await?;

    let is_complaint = body.formation_type == FormationType::Complaint;
    let case = repo::case::create(
        &pool,
        NewCase {
            title: &body.title,
            description: &body.description,
            formation_type: body.formation_type,
            status,
            crime_level_id: body.crime_level,
            filed_by: actor.id,
            filed_by_hierarchy: actor.hierarchy(),
            crime_scene_location: body.crime_scene_location.as_deref(),
            crime_scene_datetime: body.crime_scene_datetime,
            complainant_statement: if is_complaint {
                body.complainant_statement.as_deref()
            } else {
                None
            },
            witnesses: &body.witnesses,
        },
    )
    .await?;

    tracing::info!(
        case_id = case.id,
        case_number = %case.case_number,
        status = case.status.as_str(),
        "case filed"
    );
    let detail = case_detail(&pool, case).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/cases
#[utoipa::path(
    get,
    path = "/api/cases",
    params(CaseListParams),
    responses(
        (status = 200, description = "Cases visible to the caller", body = CaseListResponse)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_cases(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<CaseListParams>,
) -> Result<Json<CaseListResponse>, AppError> {
    let (cases, total) =
        repo::case::list(&pool, &params, visibility::case_scope(&actor)).await?;
    Ok(Json(CaseListResponse {
        cases: cases.into_iter().map(CaseResponse::from).collect(),
        total,
    }))
}

/// GET /api/cases/public
#[utoipa::path(
    get,
    path = "/api/cases/public",
    responses(
        (status = 200, description = "Publicly listed crime-scene cases", body = Vec<PublicCaseResponse>)
    ),
    tag = "cases"
)]
pub async fn list_public_cases(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
) -> Result<Json<Vec<PublicCaseResponse>>, AppError> {
    let cases = repo::case::list_public(&pool, &workflow.public_statuses).await?;
    Ok(Json(cases.into_iter().map(PublicCaseResponse::from).collect()))
}

/// GET /api/cases/{id}
#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case detail", body = CaseDetailResponse),
        (status = 404, description = "Not found or not visible", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_case(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<CaseDetailResponse>, AppError> {
    let case = visibility::load_visible_case(&pool, &actor, id).await?;
    Ok(Json(case_detail(&pool, case).await?))
}

/// Check an assignee exists and holds at least `level`.
async fn require_assignee(
    pool: &Pool<Sqlite>,
    field: &'static str,
    user_id: i64,
    level: i32,
    what: &str,
) -> Result<(), AppError> {
    let user = repo::user::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::field(field, format!("User {user_id} does not exist")))?;
    if user.role_set().at_least(level) {
        Ok(())
    } else {
        Err(AppError::field(
            field,
            format!("{} cannot be assigned as {what}", user.display_name),
        ))
    }
}

/// PATCH /api/cases/{id}
#[utoipa::path(
    patch,
    path = "/api/cases/{id}",
    request_body = UpdateCaseRequest,
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case updated", body = CaseDetailResponse),
        (status = 400, description = "Not editable in the current stage", body = AppError),
        (status = 403, description = "Not allowed", body = AppError),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn update_case(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCaseRequest>,
) -> Result<Json<CaseDetailResponse>, AppError> {
    body.validate_request()?;
    let case = visibility::load_visible_case(&pool, &actor, id).await?;

    if body.status.is_some() && !actor.is_admin() {
        return Err(AppError::forbidden("Only administrators can set a case's status directly")
            .with_code("forbidden"));
    }

    let mut next_status = case.status;
    if body.touches_assignment() {
        actor.require(hierarchy::SERGEANT, "Assigning investigators")?;
        if let Some(detective) = body.assigned_detective {
            require_assignee(&pool, "assigned_detective", detective, hierarchy::DETECTIVE, "detective")
                .await?;
            next_status = assign_detective_status(case.status)?;
        }
        if let Some(sergeant) = body.assigned_sergeant {
            require_assignee(&pool, "assigned_sergeant", sergeant, hierarchy::SERGEANT, "sergeant")
                .await?;
        }
    }

    if body.touches_content() {
        check_editable(&case.facts(), actor.id, &actor.roles)?;
        if let Some(level) = body.crime_level {
            require_crime_level(&pool, level).await?;
        }
    }

    if let Some(forced) = body.status {
        next_status = forced;
    }

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    if body.touches_content() {
        repo::case::update_content(
            &mut tx,
            id,
            body.title.as_deref(),
            body.description.as_deref(),
            body.crime_level,
            body.crime_scene_location.as_deref(),
        )
        .await?;
    }
    if body.touches_assignment() {
        repo::case::assign(&mut tx, id, body.assigned_detective, body.assigned_sergeant).await?;
    }
    if next_status != case.status {
        let moved = repo::case::transition(
            &mut tx,
            id,
            (case.status, case.rejection_count),
            (next_status, case.rejection_count),
        )
        .await?;
        if !moved {
            drop(tx);
            return Err(stale_case_error(&pool, id, |fresh| {
                if body.status.is_some() {
                    Ok(())
                } else {
                    assign_detective_status(fresh.status).map(|_| ()).map_err(AppError::from)
                }
            })
            .await);
        }
    }

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    if body.status.is_some() {
        tracing::warn!(
            case_id = id,
            from = case.status.as_str(),
            to = next_status.as_str(),
            admin_id = actor.id,
            "case status overridden by administrator"
        );
    } else if next_status != case.status {
        tracing::info!(
            case_id = id,
            from = case.status.as_str(),
            to = next_status.as_str(),
            "investigation opened"
        );
    }

    let case = repo::case::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {id} not found")))?;
    Ok(Json(case_detail(&pool, case).await?))
}

// ── Review workflow ────────────────────────────────────────────────

async fn review(
    pool: &Pool<Sqlite>,
    actor: &Actor,
    id: i64,
    stage: ReviewStage,
    body: ReviewCaseRequest,
) -> Result<CaseDetailResponse, AppError> {
    let case = visibility::load_visible_case(pool, actor, id).await?;
    let reason = body.rejection_reason.as_deref();
    let outcome = review_case(&case.facts(), stage, actor.id, &actor.roles, body.decision, reason)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let moved = repo::case::transition(
        &mut tx,
        id,
        (case.status, case.rejection_count),
        (outcome.status, outcome.rejection_count),
    )
    .await?;
    if !moved {
        drop(tx);
        return Err(stale_case_error(pool, id, |fresh| {
            review_case(&fresh.facts(), stage, actor.id, &actor.roles, body.decision, reason)
                .map(|_| ())
                .map_err(AppError::from)
        })
        .await);
    }

    repo::review::insert(
        &mut tx,
        id,
        Reviewer {
            id: actor.id,
            role: actor.role_name(),
            hierarchy: actor.hierarchy(),
        },
        stage,
        body.decision,
        reason,
    )
    .await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        case_id = id,
        stage = ?stage,
        decision = ?body.decision,
        from = case.status.as_str(),
        to = outcome.status.as_str(),
        rejection_count = outcome.rejection_count,
        reviewer_id = actor.id,
        "case reviewed"
    );

    let case = repo::case::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {id} not found")))?;
    case_detail(pool, case).await
}

/// POST /api/cases/{id}/cadet_review
#[utoipa::path(
    post,
    path = "/api/cases/{id}/cadet_review",
    request_body = ReviewCaseRequest,
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Review recorded", body = CaseDetailResponse),
        (status = 400, description = "Case is not in cadet review", body = AppError),
        (status = 403, description = "Not allowed to review", body = AppError),
        (status = 422, description = "Rejection reason missing", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn cadet_review(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<ReviewCaseRequest>,
) -> Result<Json<CaseDetailResponse>, AppError> {
    review(&pool, &actor, id, ReviewStage::CadetReview, body)
        .await
        .map(Json)
}

/// POST /api/cases/{id}/officer_review
#[utoipa::path(
    post,
    path = "/api/cases/{id}/officer_review",
    request_body = ReviewCaseRequest,
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Review recorded", body = CaseDetailResponse),
        (status = 400, description = "Case is not in officer review", body = AppError),
        (status = 403, description = "Not allowed to review", body = AppError),
        (status = 422, description = "Rejection reason missing", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn officer_review(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<ReviewCaseRequest>,
) -> Result<Json<CaseDetailResponse>, AppError> {
    review(&pool, &actor, id, ReviewStage::OfficerReview, body)
        .await
        .map(Json)
}

/// POST /api/cases/{id}/resubmit
#[utoipa::path(
    post,
    path = "/api/cases/{id}/resubmit",
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case back in cadet review", body = CaseDetailResponse),
        (status = 400, description = "Not resubmittable", body = AppError),
        (status = 403, description = "Only the filer may resubmit", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool))]
pub async fn resubmit(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<CaseDetailResponse>, AppError> {
    let case = visibility::load_visible_case(&pool, &actor, id).await?;
    let next = resubmit_case(&case.facts(), actor.id, &actor.roles)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let moved = repo::case::transition(
        &mut tx,
        id,
        (case.status, case.rejection_count),
        (next, case.rejection_count),
    )
    .await?;
    if !moved {
        drop(tx);
        return Err(stale_case_error(&pool, id, |fresh| {
            resubmit_case(&fresh.facts(), actor.id, &actor.roles)
                .map(|_| ())
                .map_err(AppError::from)
        })
        .await);
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        case_id = id,
        from = case.status.as_str(),
        to = next.as_str(),
        rejection_count = case.rejection_count,
        "case resubmitted"
    );

    let case = repo::case::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {id} not found")))?;
    Ok(Json(case_detail(&pool, case).await?))
}

/// POST /api/cases/{id}/join_case
#[utoipa::path(
    post,
    path = "/api/cases/{id}/join_case",
    request_body = JoinCaseRequest,
    params(("id" = i64, Path, description = "Case ID")),
    responses(
        (status = 201, description = "Joined as complainant", body = ComplainantResponse),
        (status = 400, description = "Case not joinable", body = AppError),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Already a complainant", body = AppError)
    ),
    tag = "cases"
)]
#[tracing::instrument(skip(pool, workflow))]
pub async fn join_case(
    State(pool): State<Pool<Sqlite>>,
    State(workflow): State<Arc<WorkflowConfig>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<JoinCaseRequest>,
) -> Result<(StatusCode, Json<ComplainantResponse>), AppError> {
    body.validate_request()?;
    let case = repo::case::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {id} not found")))?;

    check_joinable(
        &case.facts(),
        &workflow.joinable_statuses,
        workflow.allow_complaint_join,
    )?;

    if repo::complainant::is_complainant(&pool, id, actor.id).await? {
        return Err(AppError::conflict("You are already a complainant on this case"));
    }

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let joined = repo::complainant::join(
        &mut tx,
        id,
        actor.id,
        &body.statement,
        &workflow.joinable_statuses,
    )
    .await?;
    let Some(complainant) = joined else {
        drop(tx);
        return Err(stale_case_error(&pool, id, |fresh| {
            check_joinable(
                &fresh.facts(),
                &workflow.joinable_statuses,
                workflow.allow_complaint_join,
            )
            .map_err(AppError::from)
        })
        .await);
    };
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(case_id = id, user_id = actor.id, "complainant joined case");
    Ok((StatusCode::CREATED, Json(ComplainantResponse::from(complainant))))
}
