use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::send_bytes;
use crate::modules::providers::requests::ImageRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "stability";

#[derive(Clone)]
pub struct StabilityImageProvider {
    client: Client,
    api_key: Option<ApiKey>,
    media: MediaStorage,
    base_url: String,
}

impl StabilityImageProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            media,
            base_url: "https://api.stability.ai".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn render(&self, key: &ApiKey, request: &ImageRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let aspect_ratio = if request.height > request.width { "9:16" } else { "16:9" };
        let form = Form::new()
            .text("prompt", request.prompt.clone())
            .text("aspect_ratio", aspect_ratio)
            .text("output_format", "png");

        let image = send_bytes(
            self.client
                .post(format!("{}/v2beta/stable-image/generate/core", self.base_url))
                .bearer_auth(key.expose())
                .header("Accept", "image/*")
                .multipart(form),
        )
        .await?;

        let id = uuid::Uuid::new_v4();
        let stored = self
            .media
            .write_bytes(MediaKind::Image, &format!("{id}.png"), &image)
            .await?;
        info!("🎨 Stability image stored at {}", stored.public_path);

        let url = self.media.public_url(&stored.public_path);
        Ok(ProviderResult::success(format!("stability-{id}"), MediaOutput::stored(url, stored)))
    }
}

#[async_trait]
impl Provider<ImageRequest> for StabilityImageProvider {
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
        settle(NAME, self.render(key, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn image_bytes_are_written_to_the_images_dir() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2beta/stable-image/generate/core"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://api.test",
        );
        let provider = StabilityImageProvider::new(Client::new(), ApiKey::parse("sk-stab"), media)
            .with_base_url(&server.uri());

        let result = provider.generate(&ImageRequest::portrait("neon city")).await;
        let ProviderResult::Success { output, .. } = result else {
            panic!("expected success, got {result:?}");
        };
        assert!(output.url.starts_with("http://api.test/images/"));
        let file = output.file.expect("file");
        assert_eq!(tokio::fs::read(file).await.expect("read"), b"\x89PNG");
    }

    #[tokio::test]
    async fn content_filter_rejection_is_an_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("content_moderation"))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(Client::new(), root.path().into(), root.path().into(), "http://api.test");
        let provider = StabilityImageProvider::new(Client::new(), ApiKey::parse("sk-stab"), media)
            .with_base_url(&server.uri());

        let result = provider.generate(&ImageRequest::portrait("x")).await;
        assert!(result.error_message().unwrap_or_default().contains("403"));
    }
}
