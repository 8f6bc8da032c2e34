use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::ImageRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "pexels";

/// Stock photo search. Free, so it leads the image priority list.
#[derive(Clone)]
pub struct PexelsImageProvider {
    client: Client,
    api_key: Option<ApiKey>,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct PhotoSearch {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: i64,
    src: PhotoSrc,
}

#[derive(Debug, Deserialize)]
struct PhotoSrc {
    portrait: String,
}

impl PexelsImageProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            media,
            base_url: "https://api.pexels.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn search(&self, key: &ApiKey, request: &ImageRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        info!("📷 Searching Pexels for '{}'", request.prompt);
        let response: PhotoSearch = send_json(
            self.client
                .get(format!("{}/v1/search", self.base_url))
                .header("Authorization", key.expose())
                .query(&[
                    ("query", request.prompt.as_str()),
                    ("per_page", "1"),
                    ("orientation", "portrait"),
                ]),
        )
        .await?;

        let photo = response
            .photos
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Rejected(format!("no photos match '{}'", request.prompt)))?;

        let output = mirror(&self.media, &photo.src.portrait, MediaKind::Image, "jpg").await;
        Ok(ProviderResult::success(format!("pexels-{}", photo.id), output))
    }
}

#[async_trait]
impl Provider<ImageRequest> for PexelsImageProvider {
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
        settle(NAME, self.search(key, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn first_portrait_photo_is_downloaded() {
        let server = MockServer::start().await;
        let photo_url = format!("{}/photos/42/portrait.jpeg", server.uri());
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("query", "mountain lake"))
            .and(header("authorization", "px-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "photos": [{ "id": 42, "src": { "portrait": photo_url } }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/photos/42/portrait.jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://localhost",
        );
        let provider = PexelsImageProvider::new(Client::new(), ApiKey::parse("px-key"), media)
            .with_base_url(&server.uri());

        let result = provider.generate(&ImageRequest::portrait("mountain lake")).await;
        let ProviderResult::Success { request_id, output } = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(request_id, "pexels-42");
        let local = output.local_path.expect("local copy");
        assert!(local.starts_with("/images/") && local.ends_with(".jpeg"), "{local}");
        assert!(output.file.expect("file").exists());
    }

    #[tokio::test]
    async fn empty_search_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "photos": [] })))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(Client::new(), root.path().into(), root.path().into(), "http://localhost");
        let provider = PexelsImageProvider::new(Client::new(), ApiKey::parse("px-key"), media)
            .with_base_url(&server.uri());

        let result = provider.generate(&ImageRequest::portrait("zzz")).await;
        assert!(result.error_message().unwrap_or_default().contains("no photos"));
    }
}
