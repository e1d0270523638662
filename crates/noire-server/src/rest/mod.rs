pub mod auth;
pub mod case;
pub mod evidence;
pub mod investigation;
pub mod trial;

use axum::{routing::{delete, get, patch, post, put}, Router};
use crate::db::AppState;

/// Build the combined REST API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth & users
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(auth::list_users))
        .route("/api/users/{id}/roles", put(auth::set_roles))
        // Cases
        .route("/api/crime-levels", get(case::list_crime_levels))
        .route("/api/cases", get(case::list_cases).post(case::create_case))
        .route("/api/cases/public", get(case::list_public_cases))
        .route("/api/cases/{id}", get(case::get_case).patch(case::update_case))
        .route("/api/cases/{id}/cadet_review", post(case::cadet_review))
        .route("/api/cases/{id}/officer_review", post(case::officer_review))
        .route("/api/cases/{id}/resubmit", post(case::resubmit))
        .route("/api/cases/{id}/join_case", post(case::join_case))
        // Evidence
        .route("/api/evidence", get(evidence::list_evidence).post(evidence::create_evidence))
        .route("/api/evidence/{id}", get(evidence::get_evidence))
        // Detective boards
        .route(
            "/api/investigation/detective-boards",
            get(investigation::list_boards).post(investigation::create_board),
        )
        .route("/api/investigation/detective-boards/{id}", get(investigation::get_board))
        .route("/api/investigation/board-items", post(investigation::create_board_item))
        .route(
            "/api/investigation/board-items/{id}",
            patch(investigation::update_board_item).delete(investigation::delete_board_item),
        )
        .route("/api/investigation/board-connections", post(investigation::create_connection))
        .route("/api/investigation/board-connections/{id}", delete(investigation::delete_connection))
        // Suspects
        .route(
            "/api/investigation/suspects",
            get(investigation::list_suspects).post(investigation::create_suspect),
        )
        .route(
            "/api/investigation/suspects/{id}",
            get(investigation::get_suspect).patch(investigation::update_suspect),
        )
        .route("/api/investigation/suspects/{id}/arrest", post(investigation::arrest_suspect))
        .route(
            "/api/investigation/suspect-submissions",
            get(investigation::list_submissions).post(investigation::create_submission),
        )
        .route(
            "/api/investigation/suspect-submissions/{id}/review",
            post(investigation::review_submission),
        )
        // Interrogations & decisions
        .route(
            "/api/investigation/interrogations",
            get(investigation::list_interrogations).post(investigation::create_interrogation),
        )
        .route("/api/investigation/interrogations/{id}", get(investigation::get_interrogation))
        .route(
            "/api/investigation/interrogations/{id}/submit_ratings",
            post(investigation::submit_ratings),
        )
        .route(
            "/api/investigation/captain-decisions",
            get(investigation::list_decisions).post(investigation::create_decision),
        )
        .route(
            "/api/investigation/captain-decisions/{id}/chief_review",
            post(investigation::chief_review),
        )
        // Trials & bail
        .route("/api/trial/trials", get(trial::list_trials).post(trial::create_trial))
        .route("/api/trial/trials/{id}", get(trial::get_trial))
        .route("/api/trial/trials/{id}/verdict", post(trial::record_verdict))
        .route("/api/trial/bails", post(trial::create_bail))
        .route("/api/trial/bails/{id}/pay", post(trial::pay_bail))
}
