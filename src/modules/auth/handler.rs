use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension,
};
use validator::Validate;

use super::dto::{AuthResponse, LoginRequest, RegisterRequest, TokenClaims, UserEnvelope};
use super::service::AuthService;
use crate::common::error::AppError;
use crate::common::extract::ApiJson;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, Data, ErrorBody};
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

type Reply<T> = Result<ApiSuccess<ApiResponse<T>>, ApiError>;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = UserEnvelope),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 409, description = "Email or username taken", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn register(State(state): State<AppState>, ApiJson(payload): ApiJson<RegisterRequest>) -> Reply<UserEnvelope> {
    payload.validate().map_err(AppError::from)?;
    let user = AuthService::register(&state, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(UserEnvelope { user }, "User registered successfully"),
        StatusCode::CREATED,
    ))
}

/// Log in and get a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login(State(state): State<AppState>, ApiJson(payload): ApiJson<LoginRequest>) -> Reply<AuthResponse> {
    payload.validate().map_err(AppError::from)?;
    let response = AuthService::login(&state, payload).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Login successful"), StatusCode::OK))
}

/// Revoke the current token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    headers: HeaderMap,
) -> Reply<Data<Option<()>>> {
    if let Some(token) = bearer_token(&headers) {
        AuthService::logout(&state, token, &claims).await?;
    }
    Ok(ApiSuccess(
        ApiResponse::success(Data { data: None }, "Logged out successfully"),
        StatusCode::OK,
    ))
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The authenticated user", body = UserEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(State(state): State<AppState>, Extension(claims): Extension<TokenClaims>) -> Reply<UserEnvelope> {
    let user = AuthService::me(&state, claims.sub).await?;
    Ok(ApiSuccess(ApiResponse::success(UserEnvelope { user }, "User retrieved"), StatusCode::OK))
}
