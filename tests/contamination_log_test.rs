mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn reporting_contamination_changes_display_status() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-CONT-1").await["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({
                "batchId": id,
                "contaminationType": "Trichoderma",
                "severity": "high",
                "affectedUnits": "12",
                "description": "green patches on bags"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let log = &body["data"];
    assert_eq!(log["severity"], "high");
    assert_eq!(log["affectedUnits"], 12);
    assert_eq!(log["reportedBy"], "WRK-1");
    assert_eq!(log["isVerified"], false);
    assert!(log["detectedDate"].is_string());

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/api/production-batches/{id}"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["displayStatus"], "contaminated");
    assert_eq!(body["data"]["contaminationCount"], 1);
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let app = TestApp::new().await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({
                "batchId": Uuid::new_v4(),
                "contaminationType": "Bacterial blotch",
                "severity": "low"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_severity_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-CONT-SEV").await["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({
                "batchId": id,
                "contaminationType": "Cobweb",
                "severity": "catastrophic"
            })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn managers_verify_logs_once() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-CONT-2").await["id"].as_str().unwrap().to_string();
    let (_, body) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({
                "batchId": id,
                "contaminationType": "Cobweb",
                "severity": "medium"
            })),
            &app.worker_token,
        )
        .await;
    let log_id = body["data"]["id"].as_str().unwrap().to_string();
    let verify_uri = format!("/api/contamination-logs/{log_id}/verify");

    let (status, _) = app
        .call(Method::PATCH, &verify_uri, None, &app.worker_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(Method::PATCH, &verify_uri, None, &app.manager_token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["isVerified"], true);
    assert_eq!(body["data"]["verifiedBy"], "MGR-1");
    let verified_at = body["data"]["verifiedAt"].clone();

    let (status, body) = app
        .call(Method::PATCH, &verify_uri, None, &app.admin_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["verifiedBy"], "MGR-1");
    assert_eq!(body["data"]["verifiedAt"], verified_at);
}

#[tokio::test]
async fn logs_filter_by_batch_and_verification() {
    let app = TestApp::new().await;
    let first = app.create_batch("B-CONT-3").await["id"].as_str().unwrap().to_string();
    let second = app.create_batch("B-CONT-4").await["id"].as_str().unwrap().to_string();

    for (batch, kind) in [(&first, "Cobweb"), (&first, "Trichoderma"), (&second, "Wet bubble")] {
        let (status, _) = app
            .call(
                Method::POST,
                "/api/contamination-logs",
                Some(json!({ "batchId": batch, "contaminationType": kind, "severity": "low" })),
                &app.worker_token,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/contamination-logs?batchId={first}"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 2);

    let (_, body) = app
        .call(
            Method::GET,
            "/api/contamination-logs?verified=true",
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn deleting_a_batch_removes_its_logs() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-CONT-5").await["id"].as_str().unwrap().to_string();
    let (_, body) = app
        .call(
            Method::POST,
            "/api/contamination-logs",
            Some(json!({ "batchId": id, "contaminationType": "Cobweb", "severity": "low" })),
            &app.worker_token,
        )
        .await;
    let log_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/production-batches/{id}"),
            None,
            &app.admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/contamination-logs/{log_id}"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
