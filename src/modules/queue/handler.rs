use axum::{
    extract::State,
    http::StatusCode,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use super::dto::{EnqueueRequest, QueueEnvelope, QueueList, RemovedResponse, UpdateQueueRequest};
use super::service::QueueService;
use crate::common::error::AppError;
use crate::common::extract::{ApiJson, ApiPath};
use crate::common::response::{ApiError, ApiResponse, ApiSuccess, ErrorBody};
use crate::modules::auth::dto::TokenClaims;
use crate::state::AppState;

type Reply<T> = Result<ApiSuccess<ApiResponse<T>>, ApiError>;

/// Schedule a rendered video for posting
#[utoipa::path(
    post,
    path = "/api/queue/{video_id}",
    params(("video_id" = Uuid, Path, description = "Video to post")),
    request_body = EnqueueRequest,
    responses(
        (status = 201, description = "Queued", body = QueueEnvelope),
        (status = 400, description = "Video not rendered or bad platforms", body = ErrorBody),
        (status = 404, description = "Video not found", body = ErrorBody),
        (status = 409, description = "Already in queue", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Queue"
)]
pub async fn enqueue(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(video_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<EnqueueRequest>,
) -> Reply<QueueEnvelope> {
    payload.validate().map_err(AppError::from)?;
    let entry = QueueService::enqueue(&state, claims.sub, video_id, payload).await?;
    Ok(ApiSuccess(
        ApiResponse::success(QueueEnvelope { entry }, "Video added to queue"),
        StatusCode::CREATED,
    ))
}

/// List my queue
#[utoipa::path(
    get,
    path = "/api/queue",
    responses((status = 200, description = "Queue entries", body = QueueList)),
    security(("bearer_auth" = [])),
    tag = "Queue"
)]
pub async fn list_queue(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> Reply<QueueList> {
    let queue = QueueService::list(&state, claims.sub).await?;
    Ok(ApiSuccess(ApiResponse::success(QueueList { queue }, "Queue retrieved"), StatusCode::OK))
}

/// Change platforms or schedule
#[utoipa::path(
    put,
    path = "/api/queue/{queue_id}",
    params(("queue_id" = Uuid, Path, description = "Queue entry id")),
    request_body = UpdateQueueRequest,
    responses(
        (status = 200, description = "Updated", body = QueueEnvelope),
        (status = 404, description = "Queue entry not found", body = ErrorBody),
        (status = 409, description = "Entry is no longer queued", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Queue"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(queue_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateQueueRequest>,
) -> Reply<QueueEnvelope> {
    payload.validate().map_err(AppError::from)?;
    let entry = QueueService::update(&state, claims.sub, queue_id, payload).await?;
    Ok(ApiSuccess(ApiResponse::success(QueueEnvelope { entry }, "Queue entry updated"), StatusCode::OK))
}

/// Remove a queue entry
#[utoipa::path(
    delete,
    path = "/api/queue/{queue_id}",
    params(("queue_id" = Uuid, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "Removed", body = RemovedResponse),
        (status = 404, description = "Queue entry not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Queue"
)]
pub async fn remove_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(queue_id): ApiPath<Uuid>,
) -> Reply<RemovedResponse> {
    QueueService::remove(&state, claims.sub, queue_id).await?;
    Ok(ApiSuccess(
        ApiResponse::success(RemovedResponse { queue_id }, "Removed from queue"),
        StatusCode::OK,
    ))
}

/// Publish a queue entry immediately
#[utoipa::path(
    post,
    path = "/api/queue/{queue_id}/post-now",
    params(("queue_id" = Uuid, Path, description = "Queue entry id")),
    responses(
        (status = 200, description = "Publishing attempted; see status and metadata", body = QueueEnvelope),
        (status = 404, description = "Queue entry not found", body = ErrorBody),
        (status = 409, description = "Already posted", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Queue"
)]
pub async fn post_now(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
    ApiPath(queue_id): ApiPath<Uuid>,
) -> Reply<QueueEnvelope> {
    let entry = QueueService::post_now(&state, claims.sub, queue_id).await?;
    let message = match entry.status {
        super::model::QueueStatus::Posted => "Posted to every platform",
        _ => "Some platforms failed",
    };
    Ok(ApiSuccess(ApiResponse::success(QueueEnvelope { entry }, message), StatusCode::OK))
}
