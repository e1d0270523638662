use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

fn registration(username: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "wilshire-blvd-1947",
        "display_name": "Elsa Lichtmann",
    })
}

#[tokio::test]
async fn register_login_and_me() {
    let (app, _pool) = test_app().await;

    let (status, user) = post_anon(&app, "/api/auth/register", registration("elsa")).await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    assert_eq!(user["roles"], json!(["base_user"]));

    let (status, login) = post_anon(
        &app,
        "/api/auth/login",
        json!({ "email": "elsa@example.com", "password": "wilshire-blvd-1947" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{login}");
    assert_eq!(login["token_type"], "Bearer");

    let me = TestUser {
        id: user["id"].as_i64().unwrap(),
        token: login["access_token"].as_str().unwrap().to_string(),
    };
    let (status, body) = get(&app, "/api/auth/me", &me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "elsa@example.com");
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let (app, _pool) = test_app().await;
    post_anon(&app, "/api/auth/register", registration("elsa")).await;
    let (status, _) = post_anon(&app, "/api/auth/register", registration("elsa")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn short_password_is_rejected() {
    let (app, _pool) = test_app().await;
    let mut body = registration("elsa");
    body["password"] = json!("short");
    let (status, err) = post_anon(&app, "/api/auth/register", body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["password"].is_string());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (app, _pool) = test_app().await;
    post_anon(&app, "/api/auth/register", registration("elsa")).await;

    let (status, err) = post_anon(
        &app,
        "/api/auth/login",
        json!({ "email": "elsa@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["kind"], "Unauthorized");

    let (status, _) = post_anon(
        &app,
        "/api/auth/login",
        json!({ "email": "nobody@example.com", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let (app, _pool) = test_app().await;
    let (status, _) = get_anon(&app, "/api/cases").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bogus = TestUser { id: 1, token: "not-a-jwt".into() };
    let (status, _) = get(&app, "/api/auth/me", &bogus).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_admins_change_roles() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let uri = format!("/api/users/{}/roles", p.citizen.id);

    let (status, err) = put_json(&app, &uri, &p.chief, json!({ "roles": ["cadet"] })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "forbidden");

    let (status, err) = put_json(&app, &uri, &p.admin, json!({ "roles": ["mayor"] })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["roles"].as_str().unwrap().contains("mayor"));

    let (status, user) = put_json(&app, &uri, &p.admin, json!({ "roles": ["Police Officer"] })).await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["roles"], json!(["police_officer"]));
}

#[tokio::test]
async fn role_change_applies_to_existing_tokens() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;

    // Token was minted while the user was a citizen.
    let (status, _) = post_json(&app, "/api/cases", &p.citizen, crime_scene_body("Scene", MEDIUM)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    put_json(
        &app,
        &format!("/api/users/{}/roles", p.citizen.id),
        &p.admin,
        json!({ "roles": ["police_officer"] }),
    )
    .await;

    let (status, case) = post_json(&app, "/api/cases", &p.citizen, crime_scene_body("Scene", MEDIUM)).await;
    assert_eq!(status, StatusCode::CREATED, "{case}");
    assert_eq!(case["status"], "officer_review");
}

#[tokio::test]
async fn listing_users_needs_sergeant_rank() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;

    let (status, _) = get(&app, "/api/users", &p.detective).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = get(&app, "/api/users", &p.sergeant).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 11);
}
