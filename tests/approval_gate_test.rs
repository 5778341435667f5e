mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

/// Moves a fresh batch to the harvesting stage as the manager.
async fn batch_at_harvesting(app: &TestApp, number: &str) -> String {
    let id = app.create_batch(number).await["id"].as_str().unwrap().to_string();
    for target in ["inoculation", "incubation", "fruiting", "harvesting"] {
        let (status, body) = app
            .submit_stage(&id, json!({}), target, &app.manager_token)
            .await;
        assert_eq!(status, StatusCode::OK, "{target}: {body}");
        assert_eq!(body["data"]["requiresApproval"], false);
    }
    id
}

async fn pending_ids(app: &TestApp) -> Vec<String> {
    let (status, body) = app
        .call(
            Method::GET,
            "/api/production-batches/pending-approval",
            None,
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b: &Value| b["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn worker_harvest_flags_batch_for_review() {
    let app = TestApp::new().await;
    let id = batch_at_harvesting(&app, "B-GATE-1").await;

    let (status, body) = app
        .submit_stage(&id, json!({ "harvestedWeightKg": 18.2 }), "post_harvest", &app.worker_token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["requiresApproval"], true);
    assert_eq!(data["isApproved"], false);
    assert_eq!(data["qualityCheckStatus"], "pending");
    assert_eq!(data["lastModifiedBy"], "WRK-1");

    assert_eq!(pending_ids(&app).await, vec![id]);
}

#[tokio::test]
async fn worker_edit_without_sensitive_fields_is_not_flagged() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-GATE-NOTES").await["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/production-batches/{id}"),
            Some(json!({ "notes": "moved trays", "contaminationRate": 0 })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["requiresApproval"], false);
    assert!(pending_ids(&app).await.is_empty());
}

#[tokio::test]
async fn worker_status_change_is_flagged() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-GATE-STATUS").await["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/production-batches/{id}"),
            Some(json!({ "status": "on_hold" })),
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "on_hold");
    assert_eq!(body["data"]["requiresApproval"], true);
}

#[tokio::test]
async fn workers_cannot_review() {
    let app = TestApp::new().await;
    let id = batch_at_harvesting(&app, "B-GATE-2").await;
    app.submit_stage(&id, json!({ "harvestedWeightKg": 5 }), "post_harvest", &app.worker_token)
        .await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/production-batches/{id}/approve"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::GET,
            "/api/production-batches/pending-approval",
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn manager_approval_clears_the_flag() {
    let app = TestApp::new().await;
    let id = batch_at_harvesting(&app, "B-GATE-3").await;
    app.submit_stage(&id, json!({ "harvestedWeightKg": 12 }), "post_harvest", &app.worker_token)
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/production-batches/{id}/approve"),
            None,
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["isApproved"], true);
    assert_eq!(data["requiresApproval"], false);
    assert_eq!(data["qualityCheckStatus"], "passed");
    assert_eq!(data["approvedBy"], "MGR-1");
    assert!(data["approvedAt"].is_string());

    assert!(pending_ids(&app).await.is_empty());
}

#[tokio::test]
async fn manager_rejection_marks_batch_contaminated() {
    let app = TestApp::new().await;
    let id = batch_at_harvesting(&app, "B-GATE-4").await;
    app.submit_stage(&id, json!({ "harvestedWeightKg": 3 }), "post_harvest", &app.worker_token)
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/production-batches/{id}/reject"),
            Some(json!({ "reason": "green mould on trays 4-9" })),
            &app.admin_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["status"], "contaminated");
    assert_eq!(data["qualityCheckStatus"], "failed");
    assert_eq!(data["isApproved"], false);
    assert_eq!(data["rejectionReason"], "green mould on trays 4-9");
    assert_eq!(data["displayStatus"], "contaminated");
}

#[tokio::test]
async fn review_queue_puts_high_risk_first() {
    let app = TestApp::new().await;
    let low = app.create_batch("B-QUEUE-LOW").await["id"].as_str().unwrap().to_string();
    let high = app.create_batch("B-QUEUE-HIGH").await["id"].as_str().unwrap().to_string();

    for (id, rate) in [(&low, 1.0), (&high, 15.0)] {
        let (status, body) = app
            .call(
                Method::PATCH,
                &format!("/api/production-batches/{id}"),
                Some(json!({ "contaminationRate": rate })),
                &app.worker_token,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    assert_eq!(pending_ids(&app).await, vec![high, low]);
}

#[tokio::test]
async fn contamination_rate_sets_risk_level() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-RISK").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/production-batches/{id}");

    for (rate, expected) in [(4.0, "low"), (6.5, "medium"), (10.5, "high"), (10.0, "medium")] {
        let (status, body) = app
            .call(
                Method::PATCH,
                &uri,
                Some(json!({ "contaminationRate": rate })),
                &app.manager_token,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["riskLevel"], expected, "rate {rate}");
    }

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(json!({ "contaminationRate": 120 })), &app.manager_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
