use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, AuthUser};
use crate::entities::user::Model as User;
use crate::errors::ServiceError;
use crate::handlers::common::created_response;
use crate::services::users::{
    ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, TokenRequest,
};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    summary = "Register a worker account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; a verification link is sent when required", body = ApiResponse<User>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email or employee id already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ServiceError> {
    let Json(request) = payload?;
    let user = state.services.accounts.register(request).await?;
    Ok(created_response(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Email verified", body = ApiResponse<User>),
        (status = 400, description = "Token invalid, expired or used", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<User> {
    let Json(request) = payload?;
    let user = state.services.accounts.verify_email(request).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    summary = "Log in with email or employee id",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token issued", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account disabled or not verified", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(request) = payload?;
    let (token, user) = state.services.accounts.login(request).await?;
    Ok(Json(ApiResponse::success(LoginResponse {
        access_token: token.access_token,
        token_type: token.token_type,
        expires_in: token.expires_in,
        user,
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset link sent if the account exists", body = ApiResponse<MessageResponse>)),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload?;
    state.services.accounts.forgot_password(request).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "If the address is registered, a reset link has been sent",
    ))))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<MessageResponse>),
        (status = 400, description = "Token invalid, expired or used", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(request) = payload?;
    state.services.accounts.reset_password(request).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password has been reset",
    ))))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = ApiResponse<User>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<User> {
    let user = state.services.accounts.get(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password));

    let session = Router::new().route("/auth/me", get(me)).with_auth();

    Router::new().merge(public).merge(session)
}
