use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Sqlite};

use noire_types::{
    hierarchy, require_stage, AppError, CaseAction, CreateEvidenceRequest, EvidenceListParams,
    EvidenceResponse,
};

use crate::auth::extractors::Actor;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::visibility;

/// Police staff and administrators read evidence.
fn reads_evidence(actor: &Actor) -> bool {
    actor.is_admin() || actor.roles.is_police()
}

// ── Evidence handlers ──────────────────────────────────────────────

/// POST /api/evidence
#[utoipa::path(
    post,
    path = "/api/evidence",
    request_body = CreateEvidenceRequest,
    responses(
        (status = 201, description = "Evidence recorded", body = EvidenceResponse),
        (status = 403, description = "Not allowed to record evidence", body = AppError),
        (status = 404, description = "Case not found", body = AppError),
        (status = 422, description = "Validation error", body = AppError)
    ),
    tag = "evidence"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_evidence(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateEvidenceRequest>,
) -> Result<(StatusCode, Json<EvidenceResponse>), AppError> {
    body.validate_request()?;
    body.check_type_fields()?;

    let case = visibility::load_visible_case(&pool, &actor, body.case).await?;

    let allowed = actor.is_admin()
        || actor.at_least(hierarchy::OFFICER)
        || repo::complainant::is_complainant(&pool, case.id, actor.id).await?;
    if !allowed {
        return Err(AppError::forbidden(
            "Recording evidence requires the rank of Police Officer or above, or being a complainant on the case",
        )
        .with_code("forbidden"));
    }
    require_stage(case.status, CaseAction::RecordEvidence)?;

    let evidence = repo::evidence::create(&pool, &body, actor.id).await?;
    tracing::info!(
        evidence_id = evidence.id,
        case_id = case.id,
        evidence_type = ?evidence.evidence_type,
        "evidence recorded"
    );
    Ok((StatusCode::CREATED, Json(EvidenceResponse::from(evidence))))
}

/// GET /api/evidence
#[utoipa::path(
    get,
    path = "/api/evidence",
    params(EvidenceListParams),
    responses(
        (status = 200, description = "Evidence visible to the caller", body = Vec<EvidenceResponse>)
    ),
    tag = "evidence"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_evidence(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<EvidenceListParams>,
) -> Result<Json<Vec<EvidenceResponse>>, AppError> {
    if !reads_evidence(&actor) {
        return Ok(Json(Vec::new()));
    }
    let evidence = repo::evidence::list(&pool, params.case).await?;
    Ok(Json(evidence.into_iter().map(EvidenceResponse::from).collect()))
}

/// GET /api/evidence/{id}
#[utoipa::path(
    get,
    path = "/api/evidence/{id}",
    params(("id" = i64, Path, description = "Evidence ID")),
    responses(
        (status = 200, description = "Evidence found", body = EvidenceResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "evidence"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_evidence(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<EvidenceResponse>, AppError> {
    let evidence = repo::evidence::find_by_id(&pool, id)
        .await?
        .filter(|_| reads_evidence(&actor))
        .ok_or_else(|| AppError::not_found(format!("Evidence {id} not found")))?;
    Ok(Json(EvidenceResponse::from(evidence)))
}
