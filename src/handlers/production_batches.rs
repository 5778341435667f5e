use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::production_batch::{BatchStatus, ProductionStage};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, PaginationParams};
use crate::repositories::BatchFilter;
use crate::services::production_batches::{
    AdvanceSupplyChainRequest, BatchView, CreateBatchRequest, RejectBatchRequest,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct BatchListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub stage: Option<ProductionStage>,
    pub status: Option<BatchStatus>,
    pub requires_approval: Option<bool>,
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/production-batches",
    summary = "List production batches",
    params(BatchListQuery),
    responses(
        (status = 200, description = "Batches with progress and contamination counts", body = ApiResponse<PaginatedResponse<BatchView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> ApiResult<PaginatedResponse<BatchView>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let filter = BatchFilter {
        stage: query.stage,
        status: query.status,
        requires_approval: query.requires_approval,
        search: query.search,
    };
    let (items, total) = state
        .services
        .production_batches
        .list(filter, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/production-batches",
    summary = "Create a production batch",
    request_body = CreateBatchRequest,
    responses(
        (status = 201, description = "Batch created at batch_creation", body = ApiResponse<BatchView>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Batch number already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn create_batch(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<BatchView>>), ServiceError> {
    let Json(request) = payload?;
    let view = state
        .services
        .production_batches
        .create(request, &auth_user.actor())
        .await?;
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/production-batches/{id}",
    summary = "Get a production batch",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch found", body = ApiResponse<BatchView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn get_batch(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<BatchView> {
    let view = state.services.production_batches.get(id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Bodies with `currentStage` complete the previous stage and advance the
/// batch; other bodies are general edits. Either may carry `expectedVersion`.
#[utoipa::path(
    patch,
    path = "/api/production-batches/{id}",
    summary = "Submit a stage or edit a batch",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body(content = Object, description = "Stage-completion payload or general edit"),
    responses(
        (status = 200, description = "Updated batch", body = ApiResponse<BatchView>),
        (status = 400, description = "Invalid payload or stage skip", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Stale stage or version", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn patch_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<BatchView> {
    let Json(body) = payload?;
    let view = state
        .services
        .production_batches
        .patch(id, body, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/production-batches/{id}/supply-chain/advance",
    summary = "Advance the supply-chain stage by one step",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body(content = AdvanceSupplyChainRequest, description = "Optional version guard"),
    responses(
        (status = 200, description = "Updated batch", body = ApiResponse<BatchView>),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn advance_supply_chain(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    payload: Option<Json<AdvanceSupplyChainRequest>>,
) -> ApiResult<BatchView> {
    let expected_version = payload.and_then(|Json(r)| r.expected_version);
    let view = state
        .services
        .production_batches
        .advance_supply_chain(id, expected_version, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    get,
    path = "/api/production-batches/pending-approval",
    summary = "Review queue",
    description = "Batches flagged by worker edits, highest review priority first",
    responses(
        (status = 200, description = "Batches awaiting review", body = ApiResponse<Vec<BatchView>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn pending_approval(State(state): State<AppState>) -> ApiResult<Vec<BatchView>> {
    let views = state.services.production_batches.pending_approval().await?;
    Ok(Json(ApiResponse::success(views)))
}

#[utoipa::path(
    post,
    path = "/api/production-batches/{id}/approve",
    summary = "Approve a batch",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch approved", body = ApiResponse<BatchView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn approve_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> ApiResult<BatchView> {
    let view = state
        .services
        .production_batches
        .approve(id, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    post,
    path = "/api/production-batches/{id}/reject",
    summary = "Reject a batch as contaminated",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = RejectBatchRequest,
    responses(
        (status = 200, description = "Batch rejected", body = ApiResponse<BatchView>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn reject_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    payload: Option<Json<RejectBatchRequest>>,
) -> ApiResult<BatchView> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let view = state
        .services
        .production_batches
        .reject(id, request, &auth_user.actor())
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

#[utoipa::path(
    delete,
    path = "/api/production-batches/{id}",
    summary = "Delete a batch and its contamination logs",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 204, description = "Batch deleted"),
        (status = 404, description = "Batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "production-batches"
)]
pub async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.production_batches.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/production-batches", get(list_batches))
        .route("/production-batches/:id", get(get_batch))
        .with_permission(perm::BATCHES_READ);

    let write = Router::new()
        .route("/production-batches", post(create_batch))
        .route("/production-batches/:id", axum::routing::patch(patch_batch))
        .route(
            "/production-batches/:id/supply-chain/advance",
            post(advance_supply_chain),
        )
        .with_permission(perm::BATCHES_WRITE);

    let review = Router::new()
        .route("/production-batches/pending-approval", get(pending_approval))
        .route("/production-batches/:id/approve", post(approve_batch))
        .route("/production-batches/:id/reject", post(reject_batch))
        .with_permission(perm::BATCHES_APPROVE);

    let delete = Router::new()
        .route(
            "/production-batches/:id",
            axum::routing::delete(delete_batch),
        )
        .with_permission(perm::BATCHES_DELETE);

    Router::new()
        .merge(read)
        .merge(write)
        .merge(review)
        .merge(delete)
}
