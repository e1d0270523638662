use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use noire_server::auth::{jwt, AuthSettings};
use noire_server::db::{self, AppState};
use noire_types::{RoleSet, WorkflowConfig};
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_JWT_SECRET: &str = "noire-test-secret-do-not-use";

/// Crime level primary keys seeded by the initial migration.
pub const CRITICAL: i64 = 1;
pub const MAJOR: i64 = 2;
pub const MEDIUM: i64 = 3;

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: Arc::from(TEST_JWT_SECRET),
        access_token_minutes: 60,
        admin_email: None,
    }
}

/// Build a test router backed by a fresh SQLite database with migrations
/// applied. Each call gets its own database file, so tests never share
/// state and may run in parallel.
pub async fn test_app() -> (Router, Pool<Sqlite>) {
    test_app_with(WorkflowConfig::default()).await
}

pub async fn test_app_with(workflow: WorkflowConfig) -> (Router, Pool<Sqlite>) {
    let path = std::env::temp_dir().join(format!("noire-test-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}", path.display());

    let pool = db::create_pool(&url, 5).expect("Failed to build test pool");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState {
        pool: pool.clone(),
        auth: auth_settings(),
        workflow: Arc::new(workflow),
    };
    let router = noire_server::openapi::app_router(state, 1024 * 1024);

    (router, pool)
}

/// A seeded user and a valid bearer token for them.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

/// Insert a user directly and mint a token in-process.
pub async fn seed_user(pool: &Pool<Sqlite>, username: &str, roles: &str) -> TestUser {
    let user = noire_server::repo::user::create(
        pool,
        username,
        &format!("{username}@lapd.test"),
        &format!("{username} (test)"),
        "!unusable",
        roles,
    )
    .await
    .expect("Failed to seed user");

    let names = RoleSet::from_names(roles.split(',')).names();
    let token = jwt::create_access_token(&auth_settings(), user.id, &user.email, &names)
        .expect("Failed to mint token");
    TestUser { id: user.id, token }
}

/// One user per rank, plus a judge and an administrator.
pub struct Precinct {
    pub citizen: TestUser,
    pub other_citizen: TestUser,
    pub cadet: TestUser,
    pub officer: TestUser,
    pub detective: TestUser,
    pub other_detective: TestUser,
    pub sergeant: TestUser,
    pub captain: TestUser,
    pub chief: TestUser,
    pub judge: TestUser,
    pub admin: TestUser,
}

pub async fn precinct(pool: &Pool<Sqlite>) -> Precinct {
    Precinct {
        citizen: seed_user(pool, "elsa", "base_user").await,
        other_citizen: seed_user(pool, "ira", "base_user").await,
        cadet: seed_user(pool, "cadet_bekowsky", "cadet").await,
        officer: seed_user(pool, "officer_malloy", "police_officer").await,
        detective: seed_user(pool, "cole_phelps", "detective").await,
        other_detective: seed_user(pool, "rusty_galloway", "detective").await,
        sergeant: seed_user(pool, "sgt_earle", "sergeant").await,
        captain: seed_user(pool, "capt_donnelly", "captain").await,
        chief: seed_user(pool, "chief_worrell", "chief").await,
        judge: seed_user(pool, "judge_hall", "judge").await,
        admin: seed_user(pool, "admin", "administrator").await,
    }
}

// ── Request helpers ────────────────────────────────────────────────

/// Send a request, returning the status and the parsed JSON body
/// (`Value::Null` for an empty body).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<&Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn get(app: &Router, uri: &str, user: &TestUser) -> (StatusCode, Value) {
    send(app, request("GET", uri, Some(&user.token), None)).await
}

pub async fn get_anon(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, request("GET", uri, None, None)).await
}

pub async fn post_json(app: &Router, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
    send(app, request("POST", uri, Some(&user.token), Some(&body))).await
}

pub async fn post_anon(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, request("POST", uri, None, Some(&body))).await
}

pub async fn patch_json(app: &Router, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
    send(app, request("PATCH", uri, Some(&user.token), Some(&body))).await
}

pub async fn put_json(app: &Router, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
    send(app, request("PUT", uri, Some(&user.token), Some(&body))).await
}

pub async fn delete(app: &Router, uri: &str, user: &TestUser) -> (StatusCode, Value) {
    send(app, request("DELETE", uri, Some(&user.token), None)).await
}

// ── Case fixtures ──────────────────────────────────────────────────

pub fn crime_scene_body(title: &str, crime_level: i64) -> Value {
    json!({
        "title": title,
        "description": "Body found near the tar pits",
        "crime_level": crime_level,
        "formation_type": "crime_scene",
        "crime_scene_location": "Hancock Park, Los Angeles",
        "crime_scene_datetime": "2020-05-01T22:30:00Z",
        "witnesses": [{ "full_name": "Mrs. Tierney", "phone": "555-0134" }],
    })
}

pub fn complaint_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "My car was taken from outside the diner",
        "crime_level": MEDIUM,
        "formation_type": "complaint",
        "complainant_statement": "I parked at eight and it was gone by nine",
    })
}

/// File a case and return its id.
pub async fn file_case(app: &Router, user: &TestUser, body: Value) -> i64 {
    let (status, resp) = post_json(app, "/api/cases", user, body).await;
    assert_eq!(status, StatusCode::CREATED, "filing failed: {resp}");
    resp["id"].as_i64().unwrap()
}

pub async fn review(
    app: &Router,
    case_id: i64,
    stage: &str,
    user: &TestUser,
    decision: &str,
    reason: Option<&str>,
) -> (StatusCode, Value) {
    post_json(
        app,
        &format!("/api/cases/{case_id}/{stage}"),
        user,
        json!({ "decision": decision, "rejection_reason": reason }),
    )
    .await
}

/// A crime-scene case filed by the officer and approved by the captain.
pub async fn open_case(app: &Router, p: &Precinct, crime_level: i64) -> i64 {
    let id = file_case(app, &p.officer, crime_scene_body("The Red Lipstick Murder", crime_level)).await;
    let (status, resp) = review(app, id, "officer_review", &p.captain, "approved", None).await;
    assert_eq!(status, StatusCode::OK, "approval failed: {resp}");
    assert_eq!(resp["status"], "open");
    id
}

/// An open case with the precinct's detective and sergeant assigned.
pub async fn investigated_case(app: &Router, p: &Precinct, crime_level: i64) -> i64 {
    let id = open_case(app, p, crime_level).await;
    let (status, resp) = patch_json(
        app,
        &format!("/api/cases/{id}"),
        &p.sergeant,
        json!({ "assigned_detective": p.detective.id, "assigned_sergeant": p.sergeant.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "assignment failed: {resp}");
    assert_eq!(resp["status"], "under_investigation");
    id
}

/// Add the citizen as a suspect on `case_id`; returns the suspect id.
pub async fn add_suspect(app: &Router, p: &Precinct, case_id: i64) -> i64 {
    let (status, resp) = post_json(
        app,
        "/api/investigation/suspects",
        &p.detective,
        json!({ "case": case_id, "person": p.other_citizen.id, "reason": "Seen leaving the scene" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "suspect failed: {resp}");
    resp["id"].as_i64().unwrap()
}

/// Submit the suspect and have the sergeant approve: case moves to
/// `arrest_approved` and the suspect gets a warrant.
pub async fn approve_suspect(app: &Router, p: &Precinct, case_id: i64, suspect_id: i64) {
    let (status, resp) = post_json(
        app,
        "/api/investigation/suspect-submissions",
        &p.detective,
        json!({ "case": case_id, "suspects": [suspect_id], "reasoning": "Lipstick on the collar" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "submission failed: {resp}");
    let submission = resp["id"].as_i64().unwrap();

    let (status, resp) = post_json(
        app,
        &format!("/api/investigation/suspect-submissions/{submission}/review"),
        &p.sergeant,
        json!({ "decision": "approved" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "approval failed: {resp}");
}

pub async fn case_status(app: &Router, admin: &TestUser, case_id: i64) -> String {
    let (_, resp) = get(app, &format!("/api/cases/{case_id}"), admin).await;
    resp["status"].as_str().unwrap_or_default().to_string()
}
