use axum::{http::StatusCode, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::*;

async fn open_board(app: &Router, user: &TestUser, case_id: i64) -> i64 {
    let (status, board) =
        post_json(app, "/api/investigation/detective-boards", user, json!({ "case": case_id })).await;
    assert!(status == StatusCode::CREATED || status == StatusCode::OK, "{board}");
    board["id"].as_i64().unwrap()
}

async fn record_evidence(app: &Router, user: &TestUser, case_id: i64, title: &str) -> i64 {
    let (status, evidence) = post_json(
        app,
        "/api/evidence",
        user,
        json!({ "case": case_id, "evidence_type": "other", "title": title }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{evidence}");
    evidence["id"].as_i64().unwrap()
}

async fn pin(app: &Router, user: &TestUser, body: Value) -> (StatusCode, Value) {
    post_json(app, "/api/investigation/board-items", user, body).await
}

async fn pin_note(app: &Router, user: &TestUser, board: i64, label: &str) -> i64 {
    let (status, item) = pin(app, user, json!({ "board": board, "label": label })).await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    item["id"].as_i64().unwrap()
}

#[tokio::test]
async fn concurrent_board_creation_yields_one_board() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = investigated_case(&app, &p, MEDIUM).await;

    let body = json!({ "case": id });
    let (a, b) = tokio::join!(
        post_json(&app, "/api/investigation/detective-boards", &p.detective, body.clone()),
        post_json(&app, "/api/investigation/detective-boards", &p.sergeant, body.clone()),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CREATED]);
    assert_eq!(a.1["id"], b.1["id"]);

    let (_, boards) = get(&app, &format!("/api/investigation/detective-boards?case={id}"), &p.captain).await;
    assert_eq!(boards.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn boards_wait_for_an_open_case() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.officer, crime_scene_body("Still in review", MEDIUM)).await;

    let (status, err) =
        post_json(&app, "/api/investigation/detective-boards", &p.captain, json!({ "case": id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_status");
}

#[tokio::test]
async fn items_link_only_to_their_own_case() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let ours = investigated_case(&app, &p, MEDIUM).await;
    let theirs = open_case(&app, &p, MEDIUM).await;
    let board = open_board(&app, &p.detective, ours).await;

    let foreign = record_evidence(&app, &p.officer, theirs, "Someone else's glove").await;
    let (status, err) = pin(
        &app,
        &p.detective,
        json!({ "board": board, "content_type": "evidence", "object_id": foreign }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["object_id"].as_str().unwrap().contains("evidence"));

    let local = record_evidence(&app, &p.officer, ours, "Lipstick tube").await;
    let (status, item) = pin(
        &app,
        &p.detective,
        json!({ "board": board, "content_type": "evidence", "object_id": local, "position_x": 40.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{item}");
    assert_eq!(item["object_id"], local);
    assert_eq!(item["display_label"], "Lipstick tube");

    // Half a link.
    let (status, err) = pin(&app, &p.detective, json!({ "board": board, "object_id": local })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["non_field_errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn connections_are_undirected_and_unique() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = investigated_case(&app, &p, MEDIUM).await;
    let board = open_board(&app, &p.detective, id).await;
    let a = pin_note(&app, &p.detective, board, "Mr. Patterson").await;
    let b = pin_note(&app, &p.detective, board, "The Elysian Fields").await;

    let (status, err) = post_json(
        &app,
        "/api/investigation/board-connections",
        &p.detective,
        json!({ "from_item": a, "to_item": a }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["non_field_errors"][0], "An item cannot be connected to itself");

    let (status, connection) = post_json(
        &app,
        "/api/investigation/board-connections",
        &p.detective,
        json!({ "from_item": a, "to_item": b, "note": "Business partners" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{connection}");

    let (status, _) = post_json(
        &app,
        "/api/investigation/board-connections",
        &p.detective,
        json!({ "from_item": b, "to_item": a }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = delete(
        &app,
        &format!("/api/investigation/board-connections/{}", connection["id"]),
        &p.detective,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (_, board_view) = get(&app, &format!("/api/investigation/detective-boards/{board}"), &p.detective).await;
    assert_eq!(board_view["items"].as_array().unwrap().len(), 2);
    assert_eq!(board_view["connections"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn items_on_different_boards_cannot_connect() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let first = open_board(&app, &p.captain, open_case(&app, &p, MEDIUM).await).await;
    let second = open_board(&app, &p.captain, open_case(&app, &p, MEDIUM).await).await;
    let a = pin_note(&app, &p.captain, first, "Hat").await;
    let b = pin_note(&app, &p.captain, second, "Coat").await;

    let (status, err) = post_json(
        &app,
        "/api/investigation/board-connections",
        &p.captain,
        json!({ "from_item": a, "to_item": b }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err["non_field_errors"][0], "Both items must be on the same board");
}

#[tokio::test]
async fn deleting_an_item_drops_its_connections() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = investigated_case(&app, &p, MEDIUM).await;
    let board = open_board(&app, &p.detective, id).await;
    let a = pin_note(&app, &p.detective, board, "Courtney Sheldon").await;
    let b = pin_note(&app, &p.detective, board, "Morphine").await;
    post_json(
        &app,
        "/api/investigation/board-connections",
        &p.detective,
        json!({ "from_item": a, "to_item": b }),
    )
    .await;

    let (status, item) = patch_json(
        &app,
        &format!("/api/investigation/board-items/{a}"),
        &p.detective,
        json!({ "position_x": 120.5, "notes": "Medic in the war" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["position_x"], 120.5);
    assert_eq!(item["label"], "Courtney Sheldon");

    let (status, _) = delete(&app, &format!("/api/investigation/board-items/{a}"), &p.detective).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, board_view) = get(&app, &format!("/api/investigation/detective-boards/{board}"), &p.detective).await;
    assert_eq!(board_view["items"].as_array().unwrap().len(), 1);
    assert_eq!(board_view["connections"].as_array().unwrap().len(), 0);

    // Outsiders cannot touch items.
    let (status, _) = delete(&app, &format!("/api/investigation/board-items/{b}"), &p.other_detective).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
