use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;

use crate::auth::{consts as perm, AuthRouterExt, AuthUser};
use crate::entities::user::Model as User;
use crate::handlers::common::{paginate, PaginationParams};
use crate::services::users::ChangeRoleRequest;
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[utoipa::path(
    get,
    path = "/api/users",
    params(PaginationParams),
    responses(
        (status = 200, description = "Accounts by name", body = ApiResponse<PaginatedResponse<User>>),
        (status = 403, description = "Admins only", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<User>> {
    let (page, limit) = params.resolve(&state.config);
    let (items, total) = state.services.accounts.list(page, limit).await?;
    Ok(Json(ApiResponse::success(paginate(items, total, page, limit))))
}

#[utoipa::path(
    patch,
    path = "/api/users/{id}/role",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<User>),
        (status = 400, description = "Cannot change your own role", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "users"
)]
pub async fn change_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    payload: Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = payload?;
    let user = state
        .services
        .accounts
        .change_role(id, request.role, auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(change_role))
        .with_permission(perm::USERS_MANAGE)
}
