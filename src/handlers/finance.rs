use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::financial_transaction::{Model as FinancialTransaction, TransactionType};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, PaginationParams};
use crate::services::finance::{CreateTransactionRequest, FinanceSummary, TransactionFilter};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct TransactionQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub transaction_type: Option<TransactionType>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionQuery {
    fn filter(&self) -> TransactionFilter {
        TransactionFilter {
            transaction_type: self.transaction_type,
            category: self.category.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/financial-transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = ApiResponse<FinancialTransaction>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "finance"
)]
pub async fn record_transaction(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FinancialTransaction>>), ServiceError> {
    let Json(request) = payload?;
    let created = state
        .services
        .finance
        .record(request, &auth_user.actor())
        .await?;
    Ok(created_response(created))
}

#[utoipa::path(
    get,
    path = "/api/financial-transactions",
    params(TransactionQuery),
    responses((status = 200, description = "Transactions, newest first", body = ApiResponse<PaginatedResponse<FinancialTransaction>>)),
    security(("Bearer" = [])),
    tag = "finance"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<PaginatedResponse<FinancialTransaction>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .finance
        .list(query.filter(), page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/financial-transactions/summary",
    params(TransactionQuery),
    responses((status = 200, description = "Income, expense and per-category totals", body = ApiResponse<FinanceSummary>)),
    security(("Bearer" = [])),
    tag = "finance"
)]
pub async fn transaction_summary(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> ApiResult<FinanceSummary> {
    let summary = state.services.finance.summary(query.filter()).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/financial-transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction found", body = ApiResponse<FinancialTransaction>),
        (status = 404, description = "Transaction not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "finance"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<FinancialTransaction> {
    let transaction = state.services.finance.get(id).await?;
    Ok(Json(ApiResponse::success(transaction)))
}

#[utoipa::path(
    delete,
    path = "/api/financial-transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses((status = 204, description = "Transaction deleted")),
    security(("Bearer" = [])),
    tag = "finance"
)]
pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.finance.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/financial-transactions", get(list_transactions))
        .route("/financial-transactions/summary", get(transaction_summary))
        .route("/financial-transactions/:id", get(get_transaction))
        .with_permission(perm::FINANCE_READ);

    let write = Router::new()
        .route("/financial-transactions", post(record_transaction))
        .route("/financial-transactions/:id", delete(delete_transaction))
        .with_permission(perm::FINANCE_WRITE);

    Router::new().merge(read).merge(write)
}
