use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::customer::Model as Customer;
use crate::entities::order::{Model as Order, OrderStatus};
use crate::entities::product::Model as Product;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, DateRange, PaginationParams};
use crate::services::sales::{
    CreateOrderRequest, CreateProductRequest, CustomerRequest, OrderFilter, SalesSummary,
    UpdateOrderStatusRequest, UpdateProductRequest,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct CustomerQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ProductQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Hide discontinued products
    pub active_only: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct OrderQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// Customers

#[utoipa::path(
    post,
    path = "/api/customers",
    request_body = CustomerRequest,
    responses((status = 201, description = "Customer created", body = ApiResponse<Customer>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Customer>>), ServiceError> {
    let Json(request) = payload?;
    let customer = state.services.sales.create_customer(request).await?;
    Ok(created_response(customer))
}

#[utoipa::path(
    get,
    path = "/api/customers",
    params(CustomerQuery),
    responses((status = 200, description = "Customers", body = ApiResponse<PaginatedResponse<Customer>>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<PaginatedResponse<Customer>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .sales
        .list_customers(query.search, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer found", body = ApiResponse<Customer>),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Customer> {
    let customer = state.services.sales.get_customer(id).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    request_body = CustomerRequest,
    responses((status = 200, description = "Customer updated", body = ApiResponse<Customer>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<CustomerRequest>, JsonRejection>,
) -> ApiResult<Customer> {
    let Json(request) = payload?;
    let customer = state.services.sales.update_customer(id, request).await?;
    Ok(Json(ApiResponse::success(customer)))
}

#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 204, description = "Customer deleted"),
        (status = 409, description = "Customer has orders", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.sales.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Products

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<Product>),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ServiceError> {
    let Json(request) = payload?;
    let product = state.services.sales.create_product(request).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductQuery),
    responses((status = 200, description = "Products", body = ApiResponse<PaginatedResponse<Product>>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<PaginatedResponse<Product>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .sales
        .list_products(query.active_only.unwrap_or(false), query.search, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<Product>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Product> {
    let product = state.services.sales.get_product(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses((status = 200, description = "Product updated", body = ApiResponse<Product>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(request) = payload?;
    let product = state.services.sales.update_product(id, request).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses((status = 204, description = "Product deleted")),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.sales.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Orders

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<Order>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Customer or product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>), ServiceError> {
    let Json(request) = payload?;
    let order = state
        .services
        .sales
        .create_order(request, &auth_user.actor())
        .await?;
    Ok(created_response(order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderQuery),
    responses((status = 200, description = "Orders, newest first", body = ApiResponse<PaginatedResponse<Order>>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderQuery>,
) -> ApiResult<PaginatedResponse<Order>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let filter = OrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        from: query.from,
        to: query.to,
    };
    let (items, total) = state.services.sales.list_orders(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/orders/summary",
    params(DateRange),
    responses((status = 200, description = "Revenue and status counts", body = ApiResponse<SalesSummary>)),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> ApiResult<SalesSummary> {
    let summary = state.services.sales.sales_summary(range.from, range.to).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = ApiResponse<Order>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn get_order(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Order> {
    let order = state.services.sales.get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Order>),
        (status = 400, description = "Order is already final", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> ApiResult<Order> {
    let Json(request) = payload?;
    let order = state
        .services
        .sales
        .update_order_status(id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[utoipa::path(
    delete,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses((status = 204, description = "Order deleted")),
    security(("Bearer" = [])),
    tag = "sales"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.sales.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/customers", get(list_customers))
        .route("/customers/:id", get(get_customer))
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/orders", get(list_orders))
        .route("/orders/summary", get(sales_summary))
        .route("/orders/:id", get(get_order))
        .with_permission(perm::SALES_READ);

    let write = Router::new()
        .route("/customers", post(create_customer))
        .route("/customers/:id", put(update_customer).delete(delete_customer))
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/orders", post(create_order))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/orders/:id", delete(delete_order))
        .with_permission(perm::SALES_WRITE);

    Router::new().merge(read).merge(write)
}
