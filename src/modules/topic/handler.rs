use axum::{extract::State, http::StatusCode, Extension};
use validator::Validate;

use super::dto::{ScriptRequestBody, ScriptResponse};
use super::service::TopicService;
use crate::common::error::AppError;
use crate::common::extract::ApiJson;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, ErrorBody};
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;

/// Write a short-video script for a topic and save it as a draft
#[utoipa::path(
    post,
    path = "/api/topic/script",
    request_body = ScriptRequestBody,
    responses(
        (status = 201, description = "Script generated", body = ScriptResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Every script provider failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Topic"
)]
pub async fn generate_script(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<ScriptRequestBody>,
) -> Result<ApiSuccess<ApiResponse<ScriptResponse>>, ApiError> {
    payload.validate().map_err(AppError::from)?;
    let response = TopicService::generate_script(&state, claims.sub, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(response, "Script generated"),
        StatusCode::CREATED,
    ))
}
