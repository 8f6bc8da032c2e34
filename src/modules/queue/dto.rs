use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::model::{QueueEntry, QueueMetadata, QueueStatus};
use crate::modules::social::model::Platform;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    /// `youtube` and/or `instagram`.
    #[validate(length(min = 1, max = 2, message = "Choose at least one platform"))]
    pub platforms: Vec<String>,
    /// RFC 3339; defaults to now.
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQueueRequest {
    #[validate(length(min = 1, max = 2, message = "Choose at least one platform"))]
    pub platforms: Option<Vec<String>>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryResponse {
    pub id: Uuid,
    pub video_id: Uuid,
    pub platforms: Vec<Platform>,
    pub status: QueueStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub metadata: QueueMetadata,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<QueueEntry> for QueueEntryResponse {
    fn from(entry: QueueEntry) -> Self {
        Self {
            id: entry.id,
            video_id: entry.video_id,
            platforms: entry.platforms.0,
            status: entry.status,
            scheduled_at: entry.scheduled_at,
            metadata: entry.metadata.0,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueEnvelope {
    pub entry: QueueEntryResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueList {
    pub queue: Vec<QueueEntryResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovedResponse {
    pub queue_id: Uuid,
}
