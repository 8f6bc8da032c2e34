use axum::{extract::State, http::StatusCode, Extension};
use validator::Validate;

use super::dto::{ImageGenerationRequest, MediaResponse, SpeechGenerationRequest};
use super::service::MediaService;
use crate::common::error::AppError;
use crate::common::extract::ApiJson;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, ErrorBody};
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;

type Reply<T> = Result<ApiSuccess<ApiResponse<T>>, ApiError>;

/// Generate a single image
#[utoipa::path(
    post,
    path = "/api/media/image",
    request_body = ImageGenerationRequest,
    responses(
        (status = 201, description = "Image generated", body = MediaResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Every image provider failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn generate_image(
    State(state): State<AppState>,
    Extension(_claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<ImageGenerationRequest>,
) -> Reply<MediaResponse> {
    payload.validate().map_err(AppError::from)?;
    let response = MediaService::generate_image(&state, payload).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Image generated"), StatusCode::CREATED))
}

/// Synthesize narration audio
#[utoipa::path(
    post,
    path = "/api/media/speech",
    request_body = SpeechGenerationRequest,
    responses(
        (status = 201, description = "Audio generated", body = MediaResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Every speech provider failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Media"
)]
pub async fn generate_speech(
    State(state): State<AppState>,
    Extension(_claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<SpeechGenerationRequest>,
) -> Reply<MediaResponse> {
    payload.validate().map_err(AppError::from)?;
    let response = MediaService::generate_speech(&state, payload).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Speech generated"), StatusCode::CREATED))
}
