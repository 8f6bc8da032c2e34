use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::VideoRequest;
use crate::modules::providers::result::{normalize_status, settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult, ProviderStatus};

const NAME: &str = "fal";
/// Separates the model path from the queue id inside our request ids.
const ID_SEPARATOR: &str = "::";

/// fal.ai queue API. Status lookups need the model path, so request ids are
/// issued as `{model}::{queue id}`.
#[derive(Clone)]
pub struct FalVideoProvider {
    client: Client,
    api_key: Option<ApiKey>,
    model: String,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QueueTicket {
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueResult {
    video: Option<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    url: String,
}

pub fn encode_request_id(model: &str, queue_id: &str) -> String {
    format!("{model}{ID_SEPARATOR}{queue_id}")
}

pub fn decode_request_id(request_id: &str) -> Option<(&str, &str)> {
    request_id
        .rsplit_once(ID_SEPARATOR)
        .filter(|(model, id)| !model.is_empty() && !id.is_empty())
}

impl FalVideoProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, model: String, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            model,
            media,
            base_url: "https://queue.fal.run".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn auth(&self, key: &ApiKey) -> String {
        format!("Key {}", key.expose())
    }

    async fn submit(&self, key: &ApiKey, request: &VideoRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let ticket: QueueTicket = send_json(
            self.client
                .post(format!("{}/{}", self.base_url, model))
                .header("Authorization", self.auth(key))
                .json(&json!({
                    "prompt": request.prompt,
                    "duration": request.duration,
                    "aspect_ratio": if request.height > request.width { "9:16" } else { "16:9" }
                })),
        )
        .await?;

        info!("🎬 fal queued {} as {}", model, ticket.request_id);
        Ok(ProviderResult::processing(encode_request_id(model, &ticket.request_id)))
    }

    async fn poll(&self, key: &ApiKey, request_id: &str) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let (model, queue_id) = decode_request_id(request_id)
            .ok_or_else(|| ProviderError::malformed(format!("request id '{request_id}' has no model")))?;
        let base = format!("{}/{}/requests/{}", self.base_url, model, queue_id);

        let status: QueueStatus = send_json(
            self.client
                .get(format!("{base}/status"))
                .header("Authorization", self.auth(key)),
        )
        .await?;

        match normalize_status(&status.status) {
            ProviderStatus::Processing => Ok(ProviderResult::processing(request_id)),
            ProviderStatus::Error => Err(ProviderError::Rejected(
                status.error.unwrap_or_else(|| status.status.clone()),
            )),
            ProviderStatus::Success => {
                let result: QueueResult =
                    send_json(self.client.get(&base).header("Authorization", self.auth(key))).await?;
                let url = result
                    .video
                    .map(|v| v.url)
                    .ok_or_else(|| ProviderError::malformed("completed job has no video"))?;
                let output = mirror(&self.media, &url, MediaKind::Video, "mp4").await;
                Ok(ProviderResult::success(request_id, output))
            }
        }
    }
}

#[async_trait]
impl Provider<VideoRequest> for FalVideoProvider {
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
        settle(NAME, self.submit(key, request).await)
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.poll(key, request_id).await)
    }
}
