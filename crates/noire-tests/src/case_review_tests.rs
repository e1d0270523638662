use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn detective_report_needs_a_higher_rank_to_approve() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;

    let id = file_case(&app, &p.detective, crime_scene_body("Golden Butterfly", MAJOR)).await;
    assert_eq!(case_status(&app, &p.admin, id).await, "officer_review");

    // Same rank as the filer.
    let (status, err) = review(&app, id, "officer_review", &p.other_detective, "approved", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "higher_rank_required");
    assert!(err["error"].as_str().unwrap().contains("Sergeant or above"));

    // Filer approving their own report.
    let (status, err) = review(&app, id, "officer_review", &p.detective, "approved", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "higher_rank_required");

    let (status, case) = review(&app, id, "officer_review", &p.captain, "approved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "open");
    assert!(case["opened_at"].is_string());
    assert_eq!(case["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(case["reviews"][0]["reviewer_hierarchy"], 5);

    // A second approval finds the case already open.
    let (status, err) = review(&app, id, "officer_review", &p.chief, "approved", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "invalid_status");
    assert!(err["error"].as_str().unwrap().contains("already been approved"));
}

#[tokio::test]
async fn rejected_crime_scene_falls_back_to_draft() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;

    let id = file_case(&app, &p.officer, crime_scene_body("The Driver's Seat", MEDIUM)).await;
    let (status, case) = review(
        &app,
        id,
        "officer_review",
        &p.captain,
        "rejected",
        Some("No time of death recorded"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{case}");
    assert_eq!(case["status"], "draft");
    assert_eq!(case["rejection_count"], 1);
    assert_eq!(case["is_permanently_rejected"], false);
    assert_eq!(case["reviews"][0]["rejection_reason"], "No time of death recorded");

    // Filer corrects and resubmits; it re-enters review at the cadet desk.
    let (status, case) = post_json(&app, &format!("/api/cases/{id}/resubmit"), &p.officer, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{case}");
    assert_eq!(case["status"], "cadet_review");
    assert_eq!(case["rejection_count"], 1);
}

#[tokio::test]
async fn rejection_requires_a_reason() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;

    let (status, err) = review(&app, id, "cadet_review", &p.cadet, "rejected", Some("   ")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["rejection_reason"].is_string());
    assert_eq!(case_status(&app, &p.admin, id).await, "cadet_review");
}

#[tokio::test]
async fn complaint_is_dismissed_after_three_rejections() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;
    assert_eq!(case_status(&app, &p.admin, id).await, "cadet_review");

    for round in 1..=3 {
        let (status, case) = review(&app, id, "cadet_review", &p.cadet, "rejected", Some("Incomplete")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(case["status"], "rejected");
        assert_eq!(case["rejection_count"], round);
        if round < 3 {
            let (status, _) = post_json(&app, &format!("/api/cases/{id}/resubmit"), &p.citizen, json!({})).await;
            assert_eq!(status, StatusCode::OK);
        } else {
            assert_eq!(case["is_permanently_rejected"], true);
        }
    }

    let (status, err) = post_json(&app, &format!("/api/cases/{id}/resubmit"), &p.citizen, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "permanently_rejected");

    let (status, err) = patch_json(&app, &format!("/api/cases/{id}"), &p.citizen, json!({ "title": "Again" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "permanently_rejected");
}

#[tokio::test]
async fn complaint_moves_through_both_review_stages() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;

    // Officer review is not reachable before the cadet has passed it.
    let (status, err) = review(&app, id, "officer_review", &p.officer, "approved", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("awaiting cadet review"));

    let (status, case) = review(&app, id, "cadet_review", &p.cadet, "approved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "officer_review");

    let (status, case) = review(&app, id, "officer_review", &p.officer, "approved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "open");
}

#[tokio::test]
async fn citizens_cannot_review() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.citizen, complaint_body("Stolen Packard")).await;

    let (status, err) = review(&app, id, "cadet_review", &p.citizen, "approved", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "forbidden");
}

#[tokio::test]
async fn draft_stays_out_of_review_until_resubmitted() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let mut body = complaint_body("Stolen Packard");
    body["save_as_draft"] = json!(true);
    let id = file_case(&app, &p.citizen, body).await;
    assert_eq!(case_status(&app, &p.admin, id).await, "draft");

    let (status, err) = review(&app, id, "cadet_review", &p.cadet, "approved", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("draft"));

    // Only the filer resubmits.
    let (status, _) = post_json(&app, &format!("/api/cases/{id}/resubmit"), &p.other_citizen, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, case) = post_json(&app, &format!("/api/cases/{id}/resubmit"), &p.citizen, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "cadet_review");
}

#[tokio::test]
async fn chief_report_opens_immediately() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let (status, case) = post_json(&app, "/api/cases", &p.chief, crime_scene_body("Black Dahlia", CRITICAL)).await;
    assert_eq!(status, StatusCode::CREATED, "{case}");
    assert_eq!(case["status"], "open");
    assert_eq!(case["crime_level"]["name"], "Critical");
    assert_eq!(case["witnesses"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn crime_scene_needs_location_and_officer_rank() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;

    let (status, err) = post_json(&app, "/api/cases", &p.cadet, crime_scene_body("Scene", MEDIUM)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(err["code"], "forbidden");

    let mut body = crime_scene_body("Scene", MEDIUM);
    body.as_object_mut().unwrap().remove("crime_scene_location");
    let (status, err) = post_json(&app, "/api/cases", &p.officer, body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["crime_scene_location"].is_string());

    let (status, err) = post_json(&app, "/api/cases", &p.officer, crime_scene_body("Scene", 99)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["crime_level"].is_string());
}

#[tokio::test]
async fn sergeant_assignment_opens_the_investigation() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = open_case(&app, &p, MEDIUM).await;

    // Detective rank cannot assign.
    let (status, _) = patch_json(
        &app,
        &format!("/api/cases/{id}"),
        &p.detective,
        json!({ "assigned_detective": p.detective.id }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A cadet is not a detective.
    let (status, err) = patch_json(
        &app,
        &format!("/api/cases/{id}"),
        &p.sergeant,
        json!({ "assigned_detective": p.cadet.id }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(err["field_errors"]["assigned_detective"].is_string());

    let (status, case) = patch_json(
        &app,
        &format!("/api/cases/{id}"),
        &p.sergeant,
        json!({ "assigned_detective": p.detective.id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "under_investigation");
    assert_eq!(case["assigned_detective"], p.detective.id);
}

#[tokio::test]
async fn only_admins_force_a_status() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = open_case(&app, &p, MEDIUM).await;

    let (status, _) = patch_json(&app, &format!("/api/cases/{id}"), &p.chief, json!({ "status": "closed" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, case) = patch_json(&app, &format!("/api/cases/{id}"), &p.admin, json!({ "status": "closed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(case["status"], "closed");
}

#[tokio::test]
async fn concurrent_reviews_decide_once() {
    let (app, pool) = test_app().await;
    let p = precinct(&pool).await;
    let id = file_case(&app, &p.officer, crime_scene_body("Consolation Prize", MEDIUM)).await;

    let (a, b) = tokio::join!(
        review(&app, id, "officer_review", &p.captain, "approved", None),
        review(&app, id, "officer_review", &p.chief, "approved", None),
    );
    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses[0], StatusCode::OK);
    assert!(matches!(statuses[1], StatusCode::BAD_REQUEST | StatusCode::CONFLICT));

    let (_, case) = get(&app, &format!("/api/cases/{id}"), &p.admin).await;
    assert_eq!(case["status"], "open");
    assert_eq!(case["reviews"].as_array().unwrap().len(), 1);
}
