use axum::{
    extract::State,
    http::StatusCode,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use super::dto::{
    AiVideoResponse, CreateAiVideoRequest, CreateAvatarRequest, CreateVideoRequest, RenderResponse, StatusQuery,
    StatusResponse, VideoEnvelope, VideoList,
};
use super::service::VideoService;
use crate::common::error::AppError;
use crate::common::extract::{ApiJson, ApiPath, ApiQuery};
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, ErrorBody};
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;

type Reply<T> = Result<ApiSuccess<ApiResponse<T>>, ApiError>;

/// Generate a video from a text prompt
#[utoipa::path(
    post,
    path = "/api/videos/ai-video",
    request_body = CreateAiVideoRequest,
    responses(
        (status = 201, description = "Job accepted", body = AiVideoResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Every provider failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn create_ai_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<CreateAiVideoRequest>,
) -> Reply<AiVideoResponse> {
    payload.validate().map_err(AppError::from)?;
    let response = VideoService::create_ai_video(&state, claims.sub, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(response, "Video generation started"),
        StatusCode::CREATED,
    ))
}

/// Check an AI video job with its provider
#[utoipa::path(
    get,
    path = "/api/videos/ai-video/status/{request_id}",
    params(
        ("request_id" = String, Path, description = "Provider request id"),
        StatusQuery
    ),
    responses(
        (status = 200, description = "Normalized job status", body = StatusResponse),
        (status = 404, description = "Job belongs to another user", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn ai_video_status(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(request_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Reply<StatusResponse> {
    let response = VideoService::check_ai_video_status(&state, claims.sub, query.provider, &request_id).await?;
    Ok(ApiSuccess(ApiResponse::success(response, "Status retrieved"), StatusCode::OK))
}

/// Generate a talking-avatar video
#[utoipa::path(
    post,
    path = "/api/videos/avatar",
    request_body = CreateAvatarRequest,
    responses(
        (status = 201, description = "Job accepted", body = AiVideoResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 503, description = "Every provider failed", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn create_avatar_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<CreateAvatarRequest>,
) -> Reply<AiVideoResponse> {
    payload.validate().map_err(AppError::from)?;
    let response = VideoService::create_avatar_video(&state, claims.sub, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(response, "Avatar video generation started"),
        StatusCode::CREATED,
    ))
}

/// Create a draft video from scenes
#[utoipa::path(
    post,
    path = "/api/videos",
    request_body = CreateVideoRequest,
    responses(
        (status = 201, description = "Draft created", body = VideoEnvelope),
        (status = 400, description = "Invalid request", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn create_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiJson(payload): ApiJson<CreateVideoRequest>,
) -> Reply<VideoEnvelope> {
    payload.validate().map_err(AppError::from)?;
    let video = VideoService::create_video(&state, claims.sub, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(VideoEnvelope { video }, "Video created"),
        StatusCode::CREATED,
    ))
}

/// List the caller's videos
#[utoipa::path(
    get,
    path = "/api/videos",
    responses((status = 200, description = "Videos, newest first", body = VideoList)),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Reply<VideoList> {
    let videos = VideoService::list_videos(&state, claims.sub).await?;
    Ok(ApiSuccess(
        ApiResponse::success(VideoList { videos }, "Videos retrieved"),
        StatusCode::OK,
    ))
}

/// Get one video
#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 200, description = "Video", body = VideoEnvelope),
        (status = 404, description = "Not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn get_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Reply<VideoEnvelope> {
    let video = VideoService::get_video(&state, claims.sub, id).await?;
    Ok(ApiSuccess(
        ApiResponse::success(VideoEnvelope { video }, "Video retrieved"),
        StatusCode::OK,
    ))
}

/// Render a video's scenes into an mp4
#[utoipa::path(
    post,
    path = "/api/videos/{id}/render",
    params(("id" = Uuid, Path, description = "Video id")),
    responses(
        (status = 202, description = "Render started", body = RenderResponse),
        (status = 404, description = "Not found", body = ErrorBody),
        (status = 409, description = "Video is busy or already queued", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Videos"
)]
pub async fn render_video(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(id): ApiPath<Uuid>,
) -> Reply<RenderResponse> {
    let response = VideoService::render_video(&state, claims.sub, id).await?;
    Ok(ApiSuccess(
        ApiResponse::success(response, "Render started"),
        StatusCode::ACCEPTED,
    ))
}
