use axum::{extract::State, routing::get, Json, Router};

use crate::auth::{consts as perm, AuthRouterExt};
use crate::services::dashboard::DashboardStats;
use crate::{ApiResponse, ApiResult, AppState};

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    summary = "Farm-wide production statistics",
    responses(
        (status = 200, description = "Aggregated batch and contamination figures", body = ApiResponse<DashboardStats>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "dashboard"
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.services.dashboard.stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(get_stats))
        .with_permission(perm::DASHBOARD_READ)
}
