use axum::{
    extract::State,
    http::StatusCode,
    response::Redirect,
    Extension,
};

use super::dto::{AccountList, CallbackQuery, ConnectResponse, DisconnectResponse};
use super::model::Platform;
use super::service::SocialService;
use crate::common::error::AppError;
use crate::common::extract::{ApiPath, ApiQuery};
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, ErrorBody};
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;

type Reply<T> = Result<ApiSuccess<ApiResponse<T>>, ApiError>;

fn parse_platform(raw: &str) -> Result<Platform, ApiError> {
    raw.parse::<Platform>()
        .map_err(|e| ApiError::from(AppError::bad_request(e)))
}

/// Start linking a social account
#[utoipa::path(
    get,
    path = "/api/social/{platform}/connect",
    params(("platform" = String, Path, description = "youtube or instagram")),
    responses(
        (status = 200, description = "Consent URL", body = ConnectResponse),
        (status = 400, description = "Platform unknown or not configured", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Social"
)]
pub async fn connect(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(platform): ApiPath<String>,
) -> Reply<ConnectResponse> {
    let platform = parse_platform(&platform)?;
    let response = SocialService::connect_url(&state, claims.sub, platform).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Redirect the user to authUrl"), StatusCode::OK))
}

/// OAuth redirect target
#[utoipa::path(
    get,
    path = "/api/auth/callback/{platform}",
    params(("platform" = String, Path, description = "youtube or instagram"), CallbackQuery),
    responses(
        (status = 303, description = "Back to the frontend settings page"),
        (status = 401, description = "Missing or unknown OAuth state", body = ErrorBody)
    ),
    tag = "Social"
)]
pub async fn oauth_callback(
    State(state): State<AppState>,
    ApiPath(platform): ApiPath<String>,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let platform = parse_platform(&platform)?;
    let target = SocialService::complete_oauth(&state, platform, query).await?;
    Ok(Redirect::to(&target))
}

/// List linked social accounts
#[utoipa::path(
    get,
    path = "/api/social/accounts",
    responses((status = 200, description = "Linked accounts", body = AccountList)),
    security(("bearer_auth" = [])),
    tag = "Social"
)]
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Reply<AccountList> {
    let response = SocialService::list_accounts(&state, claims.sub).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Accounts retrieved"), StatusCode::OK))
}

/// Disconnect a social account
#[utoipa::path(
    delete,
    path = "/api/social/{platform}",
    params(("platform" = String, Path, description = "youtube or instagram")),
    responses(
        (status = 200, description = "Disconnected", body = DisconnectResponse),
        (status = 404, description = "No connected account", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Social"
)]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(platform): ApiPath<String>,
) -> Reply<DisconnectResponse> {
    let platform = parse_platform(&platform)?;
    SocialService::disconnect(&state, claims.sub, platform).await?;
    Ok(ApiSuccess(
        ApiResponse::success(DisconnectResponse { platform }, "Account disconnected"),
        StatusCode::OK,
    ))
}
