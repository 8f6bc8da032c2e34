use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::social::model::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "queue_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Queued,
    Posted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSuccess {
    pub platform: Platform,
    pub post_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PlatformFailure {
    pub platform: Platform,
    pub error: String,
}

/// Per-platform outcome of publishing attempts. `succeeded` and `unrecorded`
/// accumulate across attempts; `failures` holds only the latest attempt's errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueMetadata {
    #[serde(default)]
    pub succeeded: Vec<PlatformSuccess>,
    #[serde(default)]
    pub failures: Vec<PlatformFailure>,
    /// Posts that went out but whose upload history row could not be written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecorded: Vec<PlatformFailure>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_attempt_at: Option<OffsetDateTime>,
}

impl QueueMetadata {
    pub fn has_succeeded(&self, platform: Platform) -> bool {
        self.succeeded.iter().any(|s| s.platform == platform)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct QueueEntry {
    pub id: Uuid,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: OffsetDateTime,
    pub platforms: Json<Vec<Platform>>,
    pub status: QueueStatus,
    pub metadata: Json<QueueMetadata>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl QueueEntry {
    /// Target platforms that have not been published to yet.
    pub fn pending_platforms(&self) -> Vec<Platform> {
        self.platforms
            .iter()
            .copied()
            .filter(|p| !self.metadata.has_succeeded(*p))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: OffsetDateTime,
    pub platforms: Vec<Platform>,
}

/// A successful post, written to `social_uploads` (and `youtube_uploads`).
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub queue_id: Option<Uuid>,
    pub platform: Platform,
    pub post_id: String,
    pub url: Option<String>,
    pub title: String,
}

#[cfg(test)]
pub(crate) fn sample_entry(video_id: Uuid, user_id: Uuid, platforms: Vec<Platform>) -> QueueEntry {
    let now = OffsetDateTime::now_utc();
    QueueEntry {
        id: Uuid::new_v4(),
        video_id,
        user_id,
        scheduled_at: now,
        platforms: Json(platforms),
        status: QueueStatus::Queued,
        metadata: Json(QueueMetadata::default()),
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_platforms_skip_recorded_successes() {
        let mut entry = sample_entry(Uuid::new_v4(), Uuid::new_v4(), vec![Platform::YouTube, Platform::Instagram]);
        entry.metadata.succeeded.push(PlatformSuccess {
            platform: Platform::YouTube,
            post_id: "yt".into(),
            url: None,
        });
        assert_eq!(entry.pending_platforms(), vec![Platform::Instagram]);
    }

    #[test]
    fn metadata_serializes_in_camel_case() {
        let metadata = QueueMetadata {
            succeeded: Vec::new(),
            failures: vec![PlatformFailure {
                platform: Platform::Instagram,
                error: "boom".into(),
            }],
            unrecorded: Vec::new(),
            last_attempt_at: None,
        };
        let json = serde_json::to_value(&metadata).expect("json");
        assert_eq!(json["failures"][0]["platform"], "instagram");
        assert!(json["lastAttemptAt"].is_null());
        assert!(json.get("unrecorded").is_none());

        let parsed: QueueMetadata = serde_json::from_str("{}").expect("empty metadata");
        assert_eq!(parsed, QueueMetadata::default());
    }
}
