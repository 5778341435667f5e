use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::contamination_log::Model as ContaminationLog;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, PaginationParams};
use crate::services::contamination::CreateContaminationLogRequest;
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct LogListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Only logs for this batch
    pub batch_id: Option<Uuid>,
    pub verified: Option<bool>,
}

#[utoipa::path(
    post,
    path = "/api/contamination-logs",
    summary = "Report contamination",
    request_body = CreateContaminationLogRequest,
    responses(
        (status = 201, description = "Log recorded", body = ApiResponse<ContaminationLog>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "contamination-logs"
)]
pub async fn create_log(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateContaminationLogRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ContaminationLog>>), ServiceError> {
    let Json(request) = payload?;
    let log = state
        .services
        .contamination
        .report(request, &auth_user.actor())
        .await?;
    Ok(created_response(log))
}

#[utoipa::path(
    get,
    path = "/api/contamination-logs",
    summary = "List contamination logs",
    params(LogListQuery),
    responses(
        (status = 200, description = "Logs, newest detection first", body = ApiResponse<PaginatedResponse<ContaminationLog>>),
    ),
    security(("Bearer" = [])),
    tag = "contamination-logs"
)]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogListQuery>,
) -> ApiResult<PaginatedResponse<ContaminationLog>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .contamination
        .list(query.batch_id, query.verified, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/contamination-logs/{id}",
    summary = "Get a contamination log",
    params(("id" = Uuid, Path, description = "Log id")),
    responses(
        (status = 200, description = "Log found", body = ApiResponse<ContaminationLog>),
        (status = 404, description = "Log not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "contamination-logs"
)]
pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ContaminationLog> {
    let log = state.services.contamination.get(id).await?;
    Ok(Json(ApiResponse::success(log)))
}

#[utoipa::path(
    patch,
    path = "/api/contamination-logs/{id}/verify",
    summary = "Verify a contamination log",
    params(("id" = Uuid, Path, description = "Log id")),
    responses(
        (status = 200, description = "Log verified", body = ApiResponse<ContaminationLog>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Log not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "contamination-logs"
)]
pub async fn verify_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<ContaminationLog> {
    let log = state
        .services
        .contamination
        .verify(id, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(log)))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/contamination-logs", get(list_logs))
        .route("/contamination-logs/:id", get(get_log))
        .with_permission(perm::CONTAMINATION_READ);

    let write = Router::new()
        .route("/contamination-logs", post(create_log))
        .with_permission(perm::CONTAMINATION_WRITE);

    let verify = Router::new()
        .route("/contamination-logs/:id/verify", patch(verify_log))
        .with_permission(perm::CONTAMINATION_VERIFY);

    Router::new().merge(read).merge(write).merge(verify)
}
