use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::VideoRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "bytez";

/// Runs a hosted text-to-video model synchronously; the call returns once the
/// clip exists.
#[derive(Clone)]
pub struct BytezVideoProvider {
    client: Client,
    api_key: Option<ApiKey>,
    model: String,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    error: Option<String>,
    output: Option<serde_json::Value>,
}

impl BytezVideoProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, model: String, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            model,
            media,
            base_url: "https://api.bytez.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn run(&self, key: &ApiKey, request: &VideoRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        info!("🎬 Bytez running {} for '{}'", model, request.prompt);

        let response: RunResponse = send_json(
            self.client
                .post(format!("{}/models/v2/{}", self.base_url, model))
                .header("Authorization", format!("Key {}", key.expose()))
                .json(&json!({ "text": request.prompt })),
        )
        .await?;

        if let Some(error) = response.error.filter(|e| !e.is_empty()) {
            return Err(ProviderError::Rejected(error));
        }

        let url = match response.output {
            Some(serde_json::Value::String(url)) => url,
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .find_map(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| ProviderError::malformed("output list has no url"))?,
            _ => return Err(ProviderError::malformed("missing output url")),
        };

        let output = mirror(&self.media, &url, MediaKind::Video, "mp4").await;
        Ok(ProviderResult::success(format!("bytez-{}", uuid::Uuid::new_v4()), output))
    }
}

#[async_trait]
impl Provider<VideoRequest> for BytezVideoProvider {
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
        settle(NAME, self.run(key, request).await)
    }
}
