//! FarmOps API Library
//!
//! Backend for a mushroom farm: the production batch stage workflow with its
//! approval gate, contamination tracking, and the planning, finance, HR and
//! sales records around it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod tracing;
pub mod workflow;

use axum::{extract::State, middleware, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub auth: Arc<auth::AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the auth service and every domain service from configuration.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
        notifier: Arc<dyn services::notifications::Notifier>,
    ) -> Self {
        let auth = Arc::new(auth::AuthService::new(auth::AuthConfig::from_app_config(
            &config,
        )));
        let services = handlers::AppServices::new(
            db.clone(),
            event_sender.clone(),
            auth.clone(),
            notifier,
            services::users::AccountSettings::from_app_config(&config),
        );
        Self {
            db,
            config,
            event_sender,
            auth,
            services,
        }
    }
}

// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every `/api` route. Each group carries its own auth and permission layers.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Production workflow
        .merge(handlers::production_batches::routes())
        .merge(handlers::contamination_logs::routes())
        // Operations
        .merge(handlers::planning::routes())
        .merge(handlers::finance::routes())
        .merge(handlers::hr::routes())
        .merge(handlers::sales::routes())
        .merge(handlers::dashboard::routes())
        // Accounts
        .merge(handlers::auth::routes())
        .merge(handlers::users::routes())
}

/// Assembles the full application: API, health endpoints, Swagger UI and the
/// shared middleware stack.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let auth_service = state.auth.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(api_status))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
        .layer(crate::tracing::configure_http_tracing())
        .layer(cors)
        // Inject AuthService into request extensions for auth middleware
        .layer(middleware::from_fn_with_state(
            auth_service,
            |State(auth): State<Arc<auth::AuthService>>,
             mut request: axum::extract::Request,
             next: middleware::Next| async move {
                request.extensions_mut().insert(auth);
                next.run(request).await
            },
        ))
        // Ensure every request carries a request id for traceability
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

async fn api_status(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "farmops-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            ::tracing::warn!(error = %e, "database health check failed");
            "unhealthy"
        }
    };

    Json(ApiResponse::success(json!({
        "status": db_status,
        "checks": { "database": db_status },
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
