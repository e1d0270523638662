use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn citizens_list_only_their_own_cases() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let mine = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;
    file_case(&app, &p.other_citizen, complaint_body("Missing Jewels")).await;
    open_case(&app, &p, MEDIUM).await;

    let (status, list) = get(&app, "/api/cases", &p.citizen).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["cases"][0]["id"], mine);

    let (_, list) = get(&app, "/api/cases", &p.cadet).await;
    assert_eq!(list["total"], 3);

    let (_, list) = get(&app, "/api/cases", &p.judge).await;
    assert_eq!(list["total"], 3);
}

#[tokio::test]
async fn hidden_cases_read_as_missing() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;

    let (status, err) = get(&app, &format!("/api/cases/{id}"), &p.other_citizen).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["kind"], "NotFound");

    let (status, _) = get(&app, &format!("/api/cases/{id}"), &p.citizen).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, &format!("/api/cases/{id}"), &p.officer).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn case_list_filters_by_status() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;
    let open = open_case(&app, &p, MEDIUM).await;

    let (_, list) = get(&app, "/api/cases?status=open", &p.captain).await;
    assert_eq!(list["total"], 1);
    assert_eq!(list["cases"][0]["id"], open);
}

#[tokio::test]
async fn public_listing_needs_no_login() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let open = open_case(&app, &p, MEDIUM).await;
    file_case(&app, &p.officer, crime_scene_body("Still in review", MEDIUM)).await;
    file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;

    let (status, cases) = get_anon(&app, "/api/cases/public").await;
    assert_eq!(status, StatusCode::OK);
    let cases = cases.as_array().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0]["id"], open);
    assert_eq!(cases[0]["crime_scene_location"], "Hancock Park, Los Angeles");
    assert!(cases[0].get("description").is_none());
}

#[tokio::test]
async fn crime_levels_are_listed_most_severe_first() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let (status, levels) = get(&app, "/api/crime-levels", &p.citizen).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = levels
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Critical", "Major", "Medium", "Minor"]);
}

#[tokio::test]
async fn investigation_needs_assignment_or_sergeant_rank() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = investigated_case(&app, &p, MEDIUM).await;

    let (status, board) = post_json(&app, "/api/investigation/detective-boards", &p.detective, json!({ "case": id })).await;
    assert_eq!(status, StatusCode::CREATED);
    let board_id = board["id"].as_i64().unwrap();

    // Unassigned detective.
    let (status, _) = get(&app, &format!("/api/investigation/detective-boards/{board_id}"), &p.other_detective).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = post_json(&app, "/api/investigation/detective-boards", &p.other_detective, json!({ "case": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, boards) = get(&app, "/api/investigation/detective-boards", &p.other_detective).await;
    assert_eq!(boards.as_array().unwrap().len(), 0);

    // Any captain.
    let (status, _) = get(&app, &format!("/api/investigation/detective-boards/{board_id}"), &p.captain).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn citizens_see_no_boards() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = open_case(&app, &p, MEDIUM).await;

    let (status, first) = post_json(&app, "/api/investigation/detective-boards", &p.sergeant, json!({ "case": id })).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, again) = post_json(&app, "/api/investigation/detective-boards", &p.captain, json!({ "case": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["id"], again["id"]);

    let (status, boards) = get(&app, "/api/investigation/detective-boards", &p.citizen).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(boards.as_array().unwrap().len(), 0);

    let (status, _) = get(&app, &format!("/api/investigation/detective-boards/{}", first["id"]), &p.citizen).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_a_seeded_case_store() {
    let (app, _pool) = test_app().await;
    let (status, body) = get_anon(&app, "/health").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["service"], "noire");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["reachable"], true);
    assert_eq!(body["database"]["crime_levels"], 4);
}

#[tokio::test]
async fn health_degrades_without_crime_levels() {
    let (app, pool) = test_app().await;
    sqlx::query("DELETE FROM crime_levels WHERE level = 3")
        .execute(&pool)
        .await
        .unwrap();

    let (status, body) = get_anon(&app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"]["crime_levels"], 3);
}
