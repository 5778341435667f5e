#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use farmops_api::{
    build_router,
    config::AppConfig,
    db,
    entities::user::{self, UserRole},
    events::{self, EventSender},
    services::{notifications::MemoryNotifier, users::RegisterRequest},
    AppState,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

const TEST_SECRET: &str =
    "farmops_test_secret_key_that_is_long_enough_for_hs256_signing_in_tests_0123456789";

pub const PASSWORD: &str = "correct-horse-battery";

/// Harness running the full router against a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub notifier: Arc<MemoryNotifier>,
    pub admin_token: String,
    pub manager_token: String,
    pub worker_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.require_email_verification = false;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let notifier = Arc::new(MemoryNotifier::new());

        let state = AppState::new(
            Arc::new(pool),
            cfg,
            Arc::new(EventSender::new(event_tx)),
            notifier.clone(),
        );
        let router = build_router(state.clone(), CorsLayer::permissive());

        let admin = seed_user(&state, "Ada Admin", "admin@farm.test", Some("ADM-1"), UserRole::Admin).await;
        let manager =
            seed_user(&state, "Mo Manager", "manager@farm.test", Some("MGR-1"), UserRole::Manager).await;
        let worker =
            seed_user(&state, "Wen Worker", "worker@farm.test", Some("WRK-1"), UserRole::Worker).await;

        Self {
            router,
            admin_token: token_for(&state, &admin),
            manager_token: token_for(&state, &manager),
            worker_token: token_for(&state, &worker),
            state,
            notifier,
            _event_task: event_task,
        }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns the status with the decoded JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: &str,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Creates a batch as the manager and returns its `data` object.
    pub async fn create_batch(&self, batch_number: &str) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/production-batches",
                Some(json!({
                    "batchNumber": batch_number,
                    "productType": "Oyster",
                    "substrateType": "straw",
                    "substrateWeightKg": 120.5,
                    "location": "Room A"
                })),
                &self.manager_token,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create batch failed: {body}");
        body["data"].clone()
    }

    /// Submits a stage payload through PATCH.
    pub async fn submit_stage(
        &self,
        batch_id: &str,
        mut payload: Value,
        current_stage: &str,
        token: &str,
    ) -> (StatusCode, Value) {
        payload["currentStage"] = json!(current_stage);
        self.call(
            Method::PATCH,
            &format!("/api/production-batches/{batch_id}"),
            Some(payload),
            token,
        )
        .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn seed_user(
    state: &AppState,
    name: &str,
    email: &str,
    employee_id: Option<&str>,
    role: UserRole,
) -> user::Model {
    state
        .services
        .accounts
        .create_user(
            RegisterRequest {
                name: name.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
                employee_id: employee_id.map(str::to_string),
            },
            role,
            true,
        )
        .await
        .expect("seed user")
}

pub fn token_for(state: &AppState, user: &user::Model) -> String {
    state
        .auth
        .generate_token(user)
        .expect("issue test token")
        .access_token
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// Extracts the `token` query parameter from a notification link.
pub fn token_from_link(link: &str) -> String {
    link.split("token=")
        .nth(1)
        .map(|rest| rest.split('&').next().unwrap_or(rest).to_string())
        .expect("link carries a token")
}
