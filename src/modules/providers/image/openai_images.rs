use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::ImageRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "openai";

#[derive(Clone)]
pub struct OpenAiImageProvider {
    client: Client,
    api_key: Option<ApiKey>,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    created: Option<i64>,
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAiImageProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            media,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn draw(&self, key: &ApiKey, request: &ImageRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let size = if request.height > request.width { "1024x1792" } else { "1792x1024" };
        let response: ImagesResponse = send_json(
            self.client
                .post(format!("{}/images/generations", self.base_url))
                .bearer_auth(key.expose())
                .json(&json!({
                    "model": "dall-e-3",
                    "prompt": request.prompt,
                    "n": 1,
                    "size": size
                })),
        )
        .await?;

        let url = response
            .data
            .into_iter()
            .find_map(|d| d.url)
            .ok_or_else(|| ProviderError::malformed("image response has no url"))?;

        let output = mirror(&self.media, &url, MediaKind::Image, "png").await;
        let request_id = format!("openai-{}", response.created.unwrap_or_default());
        Ok(ProviderResult::success(request_id, output))
    }
}

#[async_trait]
impl Provider<ImageRequest> for OpenAiImageProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ImageRequest) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.draw(key, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn portrait_requests_use_tall_size() {
        let server = MockServer::start().await;
        let image_url = format!("{}/files/img.png", server.uri());
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .and(body_partial_json(serde_json::json!({ "model": "dall-e-3", "size": "1024x1792" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "created": 1700000000,
                "data": [{ "url": image_url }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://localhost",
        );
        let provider = OpenAiImageProvider::new(Client::new(), ApiKey::parse("sk-1"), media)
            .with_base_url(&server.uri());

        let result = provider.generate(&ImageRequest::portrait("a fox")).await;
        assert_eq!(result.request_id(), "openai-1700000000");
        let ProviderResult::Success { output, .. } = result else {
            panic!("expected success");
        };
        assert_eq!(output.url, image_url);
        assert!(output.local_path.is_some());
    }
}
