use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::milestone::{MilestoneStatus, Model as Milestone};
use crate::entities::task::{Model as Task, TaskStatus};
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, paginate, PaginationParams};
use crate::services::planning::{
    CreateMilestoneRequest, CreateTaskRequest, TaskFilter, UpdateMilestoneRequest,
    UpdateTaskRequest,
};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct MilestoneQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<MilestoneStatus>,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct TaskQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
    pub milestone_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/milestones",
    params(MilestoneQuery),
    responses((status = 200, description = "Milestones by due date", body = ApiResponse<PaginatedResponse<Milestone>>)),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn list_milestones(
    State(state): State<AppState>,
    Query(query): Query<MilestoneQuery>,
) -> ApiResult<PaginatedResponse<Milestone>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let (items, total) = state
        .services
        .planning
        .list_milestones(query.status, query.batch_id, page, limit)
        .await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/milestones",
    request_body = CreateMilestoneRequest,
    responses(
        (status = 201, description = "Milestone created", body = ApiResponse<Milestone>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn create_milestone(
    State(state): State<AppState>,
    auth_user: AuthUser,
    payload: Result<Json<CreateMilestoneRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Milestone>>), ServiceError> {
    let Json(request) = payload?;
    let milestone = state
        .services
        .planning
        .create_milestone(request, &auth_user.actor())
        .await?;
    Ok(created_response(milestone))
}

#[utoipa::path(
    get,
    path = "/api/milestones/{id}",
    params(("id" = Uuid, Path, description = "Milestone id")),
    responses(
        (status = 200, description = "Milestone found", body = ApiResponse<Milestone>),
        (status = 404, description = "Milestone not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn get_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Milestone> {
    let milestone = state.services.planning.get_milestone(id).await?;
    Ok(Json(ApiResponse::success(milestone)))
}

#[utoipa::path(
    put,
    path = "/api/milestones/{id}",
    params(("id" = Uuid, Path, description = "Milestone id")),
    request_body = UpdateMilestoneRequest,
    responses((status = 200, description = "Milestone updated", body = ApiResponse<Milestone>)),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn update_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateMilestoneRequest>, JsonRejection>,
) -> ApiResult<Milestone> {
    let Json(request) = payload?;
    let milestone = state.services.planning.update_milestone(id, request).await?;
    Ok(Json(ApiResponse::success(milestone)))
}

#[utoipa::path(
    delete,
    path = "/api/milestones/{id}",
    params(("id" = Uuid, Path, description = "Milestone id")),
    responses((status = 204, description = "Milestone deleted")),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn delete_milestone(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.planning.delete_milestone(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskQuery),
    responses((status = 200, description = "Tasks", body = ApiResponse<PaginatedResponse<Task>>)),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<PaginatedResponse<Task>> {
    let (page, limit) = PaginationParams {
        page: query.page,
        limit: query.limit,
    }
    .resolve(&state.config);
    let filter = TaskFilter {
        status: query.status,
        assigned_to: query.assigned_to,
        milestone_id: query.milestone_id,
        batch_id: query.batch_id,
    };
    let (items, total) = state.services.planning.list_tasks(filter, page, limit).await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<Task>),
        (status = 404, description = "Milestone or batch not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Task>>), ServiceError> {
    let Json(request) = payload?;
    let task = state.services.planning.create_task(request).await?;
    Ok(created_response(task))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task found", body = ApiResponse<Task>),
        (status = 404, description = "Task not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn get_task(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Task> {
    let task = state.services.planning.get_task(id).await?;
    Ok(Json(ApiResponse::success(task)))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses((status = 200, description = "Task updated", body = ApiResponse<Task>)),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let Json(request) = payload?;
    let task = state.services.planning.update_task(id, request).await?;
    Ok(Json(ApiResponse::success(task)))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 204, description = "Task deleted")),
    security(("Bearer" = [])),
    tag = "planning"
)]
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.planning.delete_task(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    let read = Router::new()
        .route("/milestones", get(list_milestones))
        .route("/milestones/:id", get(get_milestone))
        .route("/tasks", get(list_tasks))
        .route("/tasks/:id", get(get_task))
        .with_permission(perm::PLANNING_READ);

    let write = Router::new()
        .route("/milestones", axum::routing::post(create_milestone))
        .route(
            "/milestones/:id",
            axum::routing::put(update_milestone).delete(delete_milestone),
        )
        .route("/tasks", axum::routing::post(create_task))
        .route(
            "/tasks/:id",
            axum::routing::put(update_task).delete(delete_task),
        )
        .with_permission(perm::PLANNING_WRITE);

    Router::new().merge(read).merge(write)
}
