use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use super::dto::{EnqueueRequest, QueueEntryResponse, UpdateQueueRequest};
use super::model::{NewQueueEntry, QueueEntry, QueueStatus};
use crate::common::error::{AppError, AppResult};
use crate::modules::social::model::Platform;
use crate::modules::videos::model::VideoStatus;
use crate::modules::videos::service::VideoService;
use crate::state::AppState;

pub struct QueueService;

fn parse_platforms(raw: &[String]) -> AppResult<Vec<Platform>> {
    let mut platforms = Vec::new();
    for name in raw {
        let platform = name.parse::<Platform>().map_err(AppError::bad_request)?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    if platforms.is_empty() {
        return Err(AppError::bad_request("Choose at least one platform"));
    }
    Ok(platforms)
}

fn parse_schedule(raw: Option<&str>) -> AppResult<Option<OffsetDateTime>> {
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| {
            OffsetDateTime::parse(s.trim(), &Rfc3339)
                .map_err(|e| AppError::bad_request(format!("scheduledAt must be RFC 3339: {e}")))
        })
        .transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn owned_entry(state: &AppState, user_id: Uuid, queue_id: Uuid) -> AppResult<QueueEntry> {
    state
        .queue
        .find(queue_id)
        .await?
        .filter(|e| e.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Queue entry not found"))
}

impl QueueService {
    pub async fn enqueue(
        state: &AppState,
        user_id: Uuid,
        video_id: Uuid,
        body: EnqueueRequest,
    ) -> AppResult<QueueEntryResponse> {
        let platforms = parse_platforms(&body.platforms)?;
        let scheduled_at = parse_schedule(body.scheduled_at.as_deref())?.unwrap_or_else(OffsetDateTime::now_utc);

        let video = VideoService::owned_video(state.videos.as_ref(), user_id, video_id).await?;
        if !video.is_publishable() {
            return Err(AppError::bad_request(format!(
                "Video must be rendered before it can be queued (status {})",
                video.status.as_str()
            )));
        }

        // Backed by a unique constraint for concurrent requests.
        if state.queue.find_for_video(video_id, user_id).await?.is_some() {
            return Err(AppError::conflict("Video is already in queue"));
        }

        let entry = state
            .queue
            .create(NewQueueEntry {
                video_id,
                user_id,
                scheduled_at,
                platforms,
            })
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict("Video is already in queue")
                } else {
                    AppError::Database(e)
                }
            })?;

        state.videos.set_status(video_id, VideoStatus::Queued).await?;
        info!("🗓️ Video {} queued for {}", video_id, entry.scheduled_at);
        Ok(entry.into())
    }

    pub async fn list(state: &AppState, user_id: Uuid) -> AppResult<Vec<QueueEntryResponse>> {
        let entries = state.queue.list_for_user(user_id).await?;
        Ok(entries.into_iter().map(QueueEntryResponse::from).collect())
    }

    pub async fn update(
        state: &AppState,
        user_id: Uuid,
        queue_id: Uuid,
        body: UpdateQueueRequest,
    ) -> AppResult<QueueEntryResponse> {
        let mut entry = owned_entry(state, user_id, queue_id).await?;
        if entry.status != QueueStatus::Queued {
            return Err(AppError::conflict("Only queued entries can be changed"));
        }

        if let Some(platforms) = &body.platforms {
            entry.platforms.0 = parse_platforms(platforms)?;
        }
        if let Some(scheduled_at) = parse_schedule(body.scheduled_at.as_deref())? {
            entry.scheduled_at = scheduled_at;
        }

        state.queue.update(&entry).await?;
        Ok(entry.into())
    }

    pub async fn remove(state: &AppState, user_id: Uuid, queue_id: Uuid) -> AppResult<()> {
        let entry = owned_entry(state, user_id, queue_id).await?;
        state.queue.delete(entry.id).await?;

        if let Some(video) = state.videos.find(entry.video_id).await?
            && video.status == VideoStatus::Queued
        {
            state.videos.set_status(video.id, VideoStatus::Completed).await?;
        }
        info!("🗑️ Queue entry {} removed", queue_id);
        Ok(())
    }

    /// Publishes now instead of waiting for the schedule. A posted entry is
    /// never published twice; a failed one retries its missing platforms.
    pub async fn post_now(state: &AppState, user_id: Uuid, queue_id: Uuid) -> AppResult<QueueEntryResponse> {
        let entry = owned_entry(state, user_id, queue_id).await?;
        if entry.status == QueueStatus::Posted {
            return Err(AppError::conflict("Queue entry has already been posted"));
        }

        let entry = state.publisher.publish(entry).await?;
        Ok(entry.into())
    }
}
