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
use crate::entities::attendance::{AttendanceStatus, Model as Attendance};
use crate::entities::employee::{EmployeeStatus, Model as Employee};
use crate::entities::payroll::{Model as Payroll, PayrollStatus};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, DateRange, PaginationParams};
use crate::services::hr::{
    AttendanceFilter, AttendanceSummary, CreateEmployeeRequest, CreatePayrollRequest,
    RecordAttendanceRequest, UpdateEmployeeRequest,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct EmployeeQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<EmployeeStatus>,
    /// Matches name, employee id or position
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct AttendanceQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct PayrollQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub employee_id: Option<Uuid>,
    pub status: Option<PayrollStatus>,
}

// Employees

#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Employee created", body = ApiResponse<Employee>),
        (status = 409, description = "Employee id already in use", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<CreateEmployeeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Employee>>), ServiceError> {
    let Json(request) = payload?;
    let employee = state.services.hr.create_employee(request).await?;
    Ok(created_response(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses((status = 200, description = "Employees", body = ApiResponse<PaginatedResponse<Employee>>)),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeQuery>,
) -> ApiResult<PaginatedResponse<Employee>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .hr
        .list_employees(query.status, query.search, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee record id")),
    responses(
        (status = 200, description = "Employee found", body = ApiResponse<Employee>),
        (status = 404, description = "Employee not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Employee> {
    let employee = state.services.hr.get_employee(id).await?;
    Ok(Json(ApiResponse::success(employee)))
}

#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee record id")),
    request_body = UpdateEmployeeRequest,
    responses((status = 200, description = "Employee updated", body = ApiResponse<Employee>)),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateEmployeeRequest>, JsonRejection>,
) -> ApiResult<Employee> {
    let Json(request) = payload?;
    let employee = state.services.hr.update_employee(id, request).await?;
    Ok(Json(ApiResponse::success(employee)))
}

#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id" = Uuid, Path, description = "Employee record id")),
    responses((status = 204, description = "Employee deleted")),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.hr.delete_employee(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Attendance

#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = RecordAttendanceRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = ApiResponse<Attendance>),
        (status = 400, description = "Check-out before check-in", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already recorded for that day", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn record_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<RecordAttendanceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Attendance>>), ServiceError> {
    let Json(request) = payload?;
    let record = state
        .services
        .hr
        .record_attendance(request, &auth_user.actor())
        .await?;
    Ok(created_response(record))
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Attendance records", body = ApiResponse<PaginatedResponse<Attendance>>)),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn list_attendance(
    State(state): State<AppState>,
    Query(query): Query<AttendanceQuery>,
) -> ApiResult<PaginatedResponse<Attendance>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let filter = AttendanceFilter {
        employee_id: query.employee_id,
        status: query.status,
        from: query.from,
        to: query.to,
    };
    let (items, total) = state.services.hr.list_attendance(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    delete,
    path = "/api/attendance/{id}",
    params(("id" = Uuid, Path, description = "Attendance record id")),
    responses((status = 204, description = "Attendance record deleted")),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn delete_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.hr.delete_attendance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}/attendance-summary",
    params(("id" = Uuid, Path, description = "Employee record id"), DateRange),
    responses((status = 200, description = "Day counts and hours", body = ApiResponse<AttendanceSummary>)),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn attendance_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(range): Query<DateRange>,
) -> ApiResult<AttendanceSummary> {
    let summary = state
        .services
        .hr
        .attendance_summary(id, range.from, range.to)
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

// Payroll

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayrollRequest,
    responses(
        (status = 201, description = "Payroll record created", body = ApiResponse<Payroll>),
        (status = 400, description = "Invalid period or amounts", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn create_payroll(
    State(state): State<AppState>,
    payload: Result<Json<CreatePayrollRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Payroll>>), ServiceError> {
    let Json(request) = payload?;
    let record = state.services.hr.create_payroll(request).await?;
    Ok(created_response(record))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses((status = 200, description = "Payroll records", body = ApiResponse<PaginatedResponse<Payroll>>)),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn list_payroll(
    State(state): State<AppState>,
    Query(query): Query<PayrollQuery>,
) -> ApiResult<PaginatedResponse<Payroll>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .hr
        .list_payroll(query.employee_id, query.status, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{id}",
    params(("id" = Uuid, Path, description = "Payroll record id")),
    responses(
        (status = 200, description = "Payroll record", body = ApiResponse<Payroll>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn get_payroll(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Payroll> {
    let record = state.services.hr.get_payroll(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

#[utoipa::path(
    post,
    path = "/api/payroll/{id}/pay",
    params(("id" = Uuid, Path, description = "Payroll record id")),
    responses(
        (status = 200, description = "Marked paid", body = ApiResponse<Payroll>),
        (status = 409, description = "Already paid", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "hr"
)]
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Payroll> {
    let record = state.services.hr.mark_paid(id).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/employees", get(list_employees))
        .route("/employees/:id", get(get_employee))
        .route("/employees/:id/attendance-summary", get(attendance_summary))
        .route("/attendance", get(list_attendance))
        .route("/payroll", get(list_payroll))
        .route("/payroll/:id", get(get_payroll))
        .with_permission(perm::HR_READ);

    let write = Router::new()
        .route("/employees", post(create_employee))
        .route(
            "/employees/:id",
            axum::routing::put(update_employee).delete(delete_employee),
        )
        .route("/attendance", post(record_attendance))
        .route("/attendance/:id", delete(delete_attendance))
        .route("/payroll", post(create_payroll))
        .route("/payroll/:id/pay", post(mark_paid))
        .with_permission(perm::HR_WRITE);

    Router::new().merge(read).merge(write)
}
