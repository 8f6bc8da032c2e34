use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::VideoRequest;
use crate::modules::providers::result::{normalize_status, settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult, ProviderStatus};

const NAME: &str = "replicate";

#[derive(Clone)]
pub struct ReplicateVideoProvider {
    client: Client,
    api_key: Option<ApiKey>,
    model: String,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    output: Option<Value>,
    error: Option<Value>,
}

impl Prediction {
    /// `output` is a URL for most video models and a list of URLs for some.
    fn output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::String(url) => Some(url.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    }
}

impl ReplicateVideoProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, model: String, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            model,
            media,
            base_url: "https://api.replicate.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn settle_prediction(&self, prediction: Prediction) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        match normalize_status(&prediction.status) {
            ProviderStatus::Processing => Ok(ProviderResult::processing(prediction.id)),
            ProviderStatus::Error => {
                let reason = match prediction.error {
                    Some(Value::String(e)) => e,
                    Some(other) => other.to_string(),
                    None => prediction.status,
                };
                Err(ProviderError::Rejected(reason))
            }
            ProviderStatus::Success => {
                let url = prediction
                    .output_url()
                    .ok_or_else(|| ProviderError::malformed("prediction succeeded without output"))?;
                let output = mirror(&self.media, &url, MediaKind::Video, "mp4").await;
                Ok(ProviderResult::success(prediction.id, output))
            }
        }
    }

    async fn create(&self, key: &ApiKey, request: &VideoRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let prediction: Prediction = send_json(
            self.client
                .post(format!("{}/v1/models/{}/predictions", self.base_url, model))
                .bearer_auth(key.expose())
                .json(&json!({ "input": { "prompt": request.prompt } })),
        )
        .await?;

        info!("🎬 Replicate prediction {} is {}", prediction.id, prediction.status);
        self.settle_prediction(prediction).await
    }

    async fn fetch(&self, key: &ApiKey, request_id: &str) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let prediction: Prediction = send_json(
            self.client
                .get(format!("{}/v1/predictions/{}", self.base_url, request_id))
                .bearer_auth(key.expose()),
        )
        .await?;
        self.settle_prediction(prediction).await
    }
}

#[async_trait]
impl Provider<VideoRequest> for ReplicateVideoProvider {
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
        settle(NAME, self.create(key, request).await)
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.fetch(key, request_id).await)
    }
}
