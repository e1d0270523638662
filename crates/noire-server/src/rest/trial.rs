use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Sqlite};

use noire_types::{
    advance_case, bail_allowed, hierarchy, require_stage, AppError, BailResponse, BailStatus,
    CaseAction, CreateBailRequest, CreateTrialRequest, DecisionStatus, InvestigationListParams,
    SuspectStatus, Trial, TrialResponse, Verdict, VerdictRequest,
};

use crate::auth::extractors::{Actor, RankRequired};
use crate::error_convert::{SqlxErrorExt, ValidateRequest};
use crate::repo;
use crate::rest::case::stale_case_error;
use crate::visibility;

/// The presiding judge, administrators and sergeants and above see a trial,
/// as do the investigators assigned to its case.
async fn visible_trial(pool: &Pool<Sqlite>, actor: &Actor, id: i64) -> Result<Trial, AppError> {
    let not_found = || AppError::not_found(format!("Trial {id} not found"));
    let trial = repo::trial::find_by_id(pool, id)
        .await?
        .ok_or_else(not_found)?;
    if trial.judge_id != actor.id {
        visibility::load_investigable_case(pool, actor, trial.case_id)
            .await
            .map_err(|_| not_found())?;
    }
    Ok(trial)
}

// ── Trials ─────────────────────────────────────────────────────────

/// GET /api/trial/trials
#[utoipa::path(
    get,
    path = "/api/trial/trials",
    params(InvestigationListParams),
    responses(
        (status = 200, description = "Trials visible to the caller", body = Vec<TrialResponse>)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn list_trials(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Query(params): Query<InvestigationListParams>,
) -> Result<Json<Vec<TrialResponse>>, AppError> {
    let trials =
        repo::trial::list(&pool, params.case, visibility::investigation_scope(&actor)).await?;
    Ok(Json(trials.into_iter().map(TrialResponse::from).collect()))
}

/// POST /api/trial/trials
#[utoipa::path(
    post,
    path = "/api/trial/trials",
    request_body = CreateTrialRequest,
    responses(
        (status = 201, description = "Trial opened", body = TrialResponse),
        (status = 400, description = "Decision does not allow a trial", body = AppError),
        (status = 403, description = "Captain rank required", body = AppError),
        (status = 409, description = "A trial already exists for this decision", body = AppError),
        (status = 422, description = "Judge is not a judge", body = AppError)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_trial(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Json(body): Json<CreateTrialRequest>,
) -> Result<(StatusCode, Json<TrialResponse>), AppError> {
    actor.require(hierarchy::CAPTAIN, CaseAction::CreateTrial.title())?;

    let decision = repo::decision::find_by_id(&pool, body.captain_decision)
        .await?
        .ok_or_else(|| {
            AppError::field(
                "captain_decision",
                format!("Captain decision {} does not exist", body.captain_decision),
            )
        })?;
    if !decision.allows_trial() {
        return Err(match decision.status {
            DecisionStatus::AwaitingChief => {
                AppError::bad_request("The chief has not yet reviewed this decision")
                    .with_code("awaiting_chief")
            }
            DecisionStatus::ChiefRejected => {
                AppError::bad_request("The chief rejected this decision")
                    .with_code("chief_rejected")
            }
            _ => AppError::bad_request("Only a guilty finding can go to trial")
                .with_code("not_guilty"),
        });
    }

    let judge = repo::user::find_by_id(&pool, body.judge)
        .await?
        .filter(|u| u.role_set().is_judge())
        .ok_or_else(|| AppError::field("judge", format!("User {} is not a judge", body.judge)))?;

    let case = repo::case::find_by_id(&pool, decision.case_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {} not found", decision.case_id)))?;
    let next = advance_case(case.status, CaseAction::CreateTrial)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let id = repo::trial::create(
        &mut tx,
        case.id,
        decision.suspect_id,
        decision.id,
        judge.id,
        actor.id,
    )
    .await?;
    let moved = repo::case::transition(
        &mut tx,
        case.id,
        (case.status, case.rejection_count),
        (next, case.rejection_count),
    )
    .await?;
    if !moved {
        drop(tx);
        return Err(stale_case_error(&pool, case.id, |fresh| {
            require_stage(fresh.status, CaseAction::CreateTrial).map_err(AppError::from)
        })
        .await);
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(trial_id = id, case_id = case.id, judge_id = judge.id, "trial opened");
    let trial = repo::trial::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::internal("Trial vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(TrialResponse::from(trial))))
}

/// GET /api/trial/trials/{id}
#[utoipa::path(
    get,
    path = "/api/trial/trials/{id}",
    params(("id" = i64, Path, description = "Trial ID")),
    responses(
        (status = 200, description = "Trial found", body = TrialResponse),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn get_trial(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<TrialResponse>, AppError> {
    let trial = visible_trial(&pool, &actor, id).await?;
    Ok(Json(TrialResponse::from(trial)))
}

/// POST /api/trial/trials/{id}/verdict
///
/// Records the verdict, closes the case and settles the suspect.
#[utoipa::path(
    post,
    path = "/api/trial/trials/{id}/verdict",
    request_body = VerdictRequest,
    params(("id" = i64, Path, description = "Trial ID")),
    responses(
        (status = 200, description = "Verdict recorded", body = TrialResponse),
        (status = 403, description = "Not the presiding judge", body = AppError),
        (status = 409, description = "Verdict already recorded", body = AppError),
        (status = 422, description = "Guilty without a punishment", body = AppError)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn record_verdict(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(body): Json<VerdictRequest>,
) -> Result<Json<TrialResponse>, AppError> {
    let trial = visible_trial(&pool, &actor, id).await?;
    if trial.judge_id != actor.id && !actor.is_admin() {
        return Err(AppError::forbidden("Only the presiding judge can record the verdict")
            .with_code("forbidden"));
    }
    body.check()?;
    if trial.verdict.is_some() {
        return Err(AppError::conflict("A verdict has already been recorded for this trial"));
    }

    let case = repo::case::find_by_id(&pool, trial.case_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {} not found", trial.case_id)))?;
    let next = advance_case(case.status, CaseAction::RecordVerdict)?;
    let suspect_status = match body.verdict {
        Verdict::Guilty => SuspectStatus::Convicted,
        Verdict::Innocent => SuspectStatus::Cleared,
    };

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let recorded = repo::trial::record_verdict(
        &mut tx,
        id,
        body.verdict,
        body.punishment_title.as_deref(),
        body.punishment_description.as_deref(),
    )
    .await?;
    if !recorded {
        return Err(AppError::conflict("A verdict has already been recorded for this trial"));
    }
    let moved = repo::case::transition(
        &mut tx,
        case.id,
        (case.status, case.rejection_count),
        (next, case.rejection_count),
    )
    .await?;
    if !moved {
        drop(tx);
        return Err(stale_case_error(&pool, case.id, |fresh| {
            require_stage(fresh.status, CaseAction::RecordVerdict).map_err(AppError::from)
        })
        .await);
    }
    repo::suspect::set_status(&mut *tx, trial.suspect_id, suspect_status).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(
        trial_id = id,
        case_id = case.id,
        verdict = ?body.verdict,
        judge_id = actor.id,
        "verdict recorded; case closed"
    );
    let trial = repo::trial::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Trial {id} not found")))?;
    Ok(Json(TrialResponse::from(trial)))
}

// ── Bail ───────────────────────────────────────────────────────────

/// POST /api/trial/bails
#[utoipa::path(
    post,
    path = "/api/trial/bails",
    request_body = CreateBailRequest,
    responses(
        (status = 201, description = "Bail set", body = BailResponse),
        (status = 400, description = "Suspect not eligible for bail", body = AppError),
        (status = 403, description = "Sergeant rank required", body = AppError),
        (status = 409, description = "Bail already pending", body = AppError)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn create_bail(
    State(pool): State<Pool<Sqlite>>,
    RankRequired(actor): RankRequired<{ hierarchy::SERGEANT }>,
    Json(body): Json<CreateBailRequest>,
) -> Result<(StatusCode, Json<BailResponse>), AppError> {
    body.validate_request()?;

    let row = repo::suspect::find_by_id(&pool, body.suspect)
        .await?
        .ok_or_else(|| AppError::field("suspect", format!("Suspect {} does not exist", body.suspect)))?;
    if row.suspect.status != SuspectStatus::Arrested {
        return Err(AppError::bad_request("Bail can only be set for an arrested suspect")
            .with_code("invalid_status"));
    }
    if !bail_allowed(row.crime_level) {
        return Err(AppError::bad_request(
            "Bail is only available for medium and minor crimes",
        )
        .with_code("bail_not_allowed"));
    }

    let case = repo::case::find_by_id(&pool, row.suspect.case_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Case {} not found", row.suspect.case_id)))?;
    require_stage(case.status, CaseAction::SetBail)?;
    if repo::bail::has_pending(&pool, row.suspect.id).await? {
        return Err(AppError::conflict("This suspect already has a pending bail"));
    }

    let bail = repo::bail::create(&pool, case.id, row.suspect.id, body.amount, actor.id).await?;
    tracing::info!(
        bail_id = bail.id,
        suspect_id = bail.suspect_id,
        amount = bail.amount,
        "bail set"
    );
    Ok((StatusCode::CREATED, Json(BailResponse::from(bail))))
}

/// POST /api/trial/bails/{id}/pay
#[utoipa::path(
    post,
    path = "/api/trial/bails/{id}/pay",
    params(("id" = i64, Path, description = "Bail ID")),
    responses(
        (status = 200, description = "Bail paid; suspect released", body = BailResponse),
        (status = 404, description = "Not found", body = AppError),
        (status = 409, description = "Already paid", body = AppError)
    ),
    tag = "trial"
)]
#[tracing::instrument(skip(pool))]
pub async fn pay_bail(
    State(pool): State<Pool<Sqlite>>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<BailResponse>, AppError> {
    let bail = repo::bail::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Bail {id} not found")))?;
    if bail.status != BailStatus::Pending {
        return Err(AppError::conflict("This bail has already been paid"));
    }

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    if !repo::bail::pay(&mut tx, id, actor.id).await? {
        return Err(AppError::conflict("This bail has already been paid"));
    }
    repo::suspect::set_status(&mut *tx, bail.suspect_id, SuspectStatus::ReleasedOnBail).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(bail_id = id, suspect_id = bail.suspect_id, paid_by = actor.id, "bail paid");
    let bail = repo::bail::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Bail {id} not found")))?;
    Ok(Json(BailResponse::from(bail)))
}
