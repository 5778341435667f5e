mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn batch_walks_every_stage_to_completion() {
    let app = TestApp::new().await;
    let batch = app.create_batch("B-2024-001").await;
    let id = batch["id"].as_str().unwrap().to_string();
    let token = app.manager_token.clone();

    assert_eq!(batch["currentStage"], "batch_creation");
    assert_eq!(batch["supplyChainStage"], "farmer_delivery");
    assert_eq!(batch["status"], "active");
    assert_eq!(batch["version"], 1);
    assert_eq!(batch["nextStage"], "inoculation");

    let (status, body) = app
        .submit_stage(&id, json!({ "stage": "batch_creation", "notes": "bagged" }), "inoculation", &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["currentStage"], "inoculation");
    assert_eq!(body["data"]["notes"], "bagged");

    let (status, body) = app
        .submit_stage(
            &id,
            json!({ "spawnType": "grain", "spawnQuantityKg": "4.5" }),
            "incubation",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["spawnQuantityKg"], 4.5);
    assert_eq!(body["data"]["inoculatedBy"], "MGR-1");
    assert!(body["data"]["inoculationDate"].is_string());

    let (status, body) = app
        .submit_stage(
            &id,
            json!({ "incubationTemperatureC": 24, "contaminationRate": 7 }),
            "fruiting",
            &token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["riskLevel"], "medium");

    let (status, _) = app
        .submit_stage(&id, json!({ "fruitingHumidity": 90 }), "harvesting", &token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .submit_stage(&id, json!({ "harvestedWeightKg": 42.0 }), "post_harvest", &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["harvestedWeightKg"], 42.0);
    assert_eq!(body["data"]["harvestedBy"], "MGR-1");

    let (status, body) = app
        .submit_stage(&id, json!({ "qualityGrade": "A", "packagedWeightKg": 40 }), "completed", &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    assert_eq!(data["currentStage"], "completed");
    assert_eq!(data["status"], "completed");
    assert_eq!(data["progress"], 100.0);
    assert!(data["nextStage"].is_null());
    assert!(data["completionDate"].is_string());
    // A manager finishing the batch does not trip the review gate
    assert_eq!(data["requiresApproval"], false);
    assert_eq!(data["version"], 7);
}

#[tokio::test]
async fn harvesting_requires_a_weight() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-HARVEST").await["id"].as_str().unwrap().to_string();
    let token = app.manager_token.clone();

    for (payload, target) in [
        (json!({}), "inoculation"),
        (json!({}), "incubation"),
        (json!({}), "fruiting"),
        (json!({}), "harvesting"),
    ] {
        let (status, _) = app.submit_stage(&id, payload, target, &token).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = app
        .submit_stage(&id, json!({ "harvestNotes": "forgot to weigh" }), "post_harvest", &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
}

#[tokio::test]
async fn skipping_ahead_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-SKIP").await["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .submit_stage(&id, json!({ "fruitingHumidity": 85 }), "harvesting", &app.manager_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, &format!("/api/production-batches/{id}"), None, &app.worker_token)
        .await;
    assert_eq!(body["data"]["currentStage"], "batch_creation");
}

#[tokio::test]
async fn mismatched_stage_label_is_rejected() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-LABEL").await["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .submit_stage(&id, json!({ "stage": "fruiting" }), "inoculation", &app.manager_token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stale_submission_conflicts() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-STALE").await["id"].as_str().unwrap().to_string();
    let token = app.manager_token.clone();

    app.submit_stage(&id, json!({}), "inoculation", &token).await;
    app.submit_stage(&id, json!({}), "incubation", &token).await;

    // A second tab still showing the batch creation form
    let (status, body) = app.submit_stage(&id, json!({}), "inoculation", &token).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn expected_version_guards_edits() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-VERSION").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/production-batches/{id}");

    let (status, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(json!({ "location": "Room B", "expectedVersion": 1 })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["version"], 2);

    let (status, _) = app
        .call(
            Method::PATCH,
            &uri,
            Some(json!({ "location": "Room C", "expectedVersion": 1 })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .submit_stage(&id, json!({ "expectedVersion": 1 }), "inoculation", &app.manager_token)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn completed_batch_ignores_further_submissions() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-DONE").await["id"].as_str().unwrap().to_string();
    let token = app.manager_token.clone();

    for (payload, target) in [
        (json!({}), "inoculation"),
        (json!({}), "incubation"),
        (json!({}), "fruiting"),
        (json!({}), "harvesting"),
        (json!({ "harvestedWeightKg": 10 }), "post_harvest"),
        (json!({}), "completed"),
    ] {
        let (status, body) = app.submit_stage(&id, payload, target, &token).await;
        assert_eq!(status, StatusCode::OK, "{target}: {body}");
    }

    let (status, body) = app.submit_stage(&id, json!({}), "completed", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"], 7);
}

#[tokio::test]
async fn general_edit_cannot_fill_unreached_stages() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-EARLY").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/production-batches/{id}");
    let token = app.manager_token.clone();

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(json!({ "harvestedWeightKg": 3.0 })), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(json!({ "status": "completed" })), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.call(Method::GET, &uri, None, &token).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["currentStage"], "batch_creation");
    assert_eq!(data["status"], "active");
    assert!(data["harvestedWeightKg"].is_null());
    assert!(data["completionDate"].is_null());
    assert_eq!(data["version"], 1);

    for target in ["inoculation", "incubation", "fruiting", "harvesting"] {
        let (status, body) = app.submit_stage(&id, json!({}), target, &token).await;
        assert_eq!(status, StatusCode::OK, "{target}: {body}");
    }

    let (status, body) = app
        .call(Method::PATCH, &uri, Some(json!({ "harvestedWeightKg": 3.0 })), &token)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["harvestedWeightKg"], 3.0);

    let (status, _) = app
        .call(Method::PATCH, &uri, Some(json!({ "status": "completed" })), &token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn supply_chain_only_moves_forward() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-CHAIN").await["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/production-batches/{id}/supply-chain/advance"),
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["supplyChainStage"], "hub_processing");

    let (status, _) = app
        .call(
            Method::PATCH,
            &format!("/api/production-batches/{id}"),
            Some(json!({ "supplyChainStage": "farmer_delivery" })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_batch_numbers_conflict() {
    let app = TestApp::new().await;
    app.create_batch("B-DUP").await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/production-batches",
            Some(json!({ "batchNumber": "B-DUP", "productType": "Shiitake" })),
            &app.manager_token,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_filters_by_stage_and_requires_auth() {
    let app = TestApp::new().await;
    let first = app.create_batch("B-LIST-1").await["id"].as_str().unwrap().to_string();
    app.create_batch("B-LIST-2").await;
    app.submit_stage(&first, json!({}), "inoculation", &app.manager_token)
        .await;

    let (status, body) = app
        .call(
            Method::GET,
            "/api/production-batches?stage=inoculation",
            None,
            &app.worker_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["batchNumber"], "B-LIST-1");

    let response = app
        .request(Method::GET, "/api/production-batches", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_managers_delete_batches() {
    let app = TestApp::new().await;
    let id = app.create_batch("B-DEL").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/production-batches/{id}");

    let (status, _) = app.call(Method::DELETE, &uri, None, &app.worker_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, &uri, None, &app.manager_token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, &uri, None, &app.manager_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
