use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::{AvatarRequest, VideoRequest};
use crate::modules::providers::result::{normalize_status, settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult, ProviderStatus};

const NAME: &str = "skyreels";

/// SkyReels task API: submit returns a task id, the task query reports
/// `PENDING`, `RUNNING`, `COMPLETE` or `FAILED`.
#[derive(Clone)]
pub struct SkyReelsProvider {
    client: Client,
    api_key: Option<ApiKey>,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Submitted {
    task_id: Option<String>,
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Task {
    status: String,
    msg: Option<String>,
    data: Option<TaskData>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    video_url: Option<String>,
}

impl SkyReelsProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            media,
            base_url: "https://apis.skyreels.ai".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn submit(
        &self,
        key: &ApiKey,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let submitted: Submitted = send_json(
            self.client
                .post(format!("{}/api/v1/{}/submit", self.base_url, endpoint))
                .header("X-API-Key", key.expose())
                .json(&body),
        )
        .await?;

        let task_id = submitted.task_id.filter(|id| !id.is_empty()).ok_or_else(|| {
            ProviderError::Rejected(submitted.msg.unwrap_or_else(|| "no task id returned".to_string()))
        })?;

        info!("🎞️ SkyReels {} task {} submitted", endpoint, task_id);
        Ok(ProviderResult::processing(task_id))
    }

    async fn query(&self, key: &ApiKey, task_id: &str) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let task: Task = send_json(
            self.client
                .get(format!("{}/api/v1/task/{}", self.base_url, task_id))
                .header("X-API-Key", key.expose()),
        )
        .await?;

        match normalize_status(&task.status) {
            ProviderStatus::Processing => Ok(ProviderResult::processing(task_id)),
            ProviderStatus::Error => Err(ProviderError::Rejected(task.msg.unwrap_or(task.status))),
            ProviderStatus::Success => {
                let url = task
                    .data
                    .and_then(|d| d.video_url)
                    .ok_or_else(|| ProviderError::malformed("completed task has no video_url"))?;
                let output = mirror(&self.media, &url, MediaKind::Video, "mp4").await;
                Ok(ProviderResult::success(task_id, output))
            }
        }
    }

    async fn status_for(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.query(key, request_id).await)
    }
}

#[async_trait]
impl Provider<VideoRequest> for SkyReelsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &VideoRequest) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        let body = json!({
            "prompt": request.prompt,
            "duration": request.duration,
            "aspect_ratio": if request.height > request.width { "9:16" } else { "16:9" }
        });
        settle(NAME, self.submit(key, "video", body).await)
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        self.status_for(request_id).await
    }
}

#[async_trait]
impl Provider<AvatarRequest> for SkyReelsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Lip-syncs a portrait image to a narration track; both must be public URLs.
    async fn generate(&self, request: &AvatarRequest) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        let (Some(image_url), Some(audio_url)) = (&request.image_url, &request.audio_url) else {
            return ProviderResult::error("skyreels: avatar video needs an image and an audio track");
        };
        let body = json!({ "image_url": image_url, "audio_url": audio_url });
        settle(NAME, self.submit(key, "avatar", body).await)
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        self.status_for(request_id).await
    }
}
