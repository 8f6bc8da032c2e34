use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::{mirror, send_json};
use crate::modules::providers::requests::{AvatarRequest, VideoRequest};
use crate::modules::providers::result::{normalize_status, settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult, ProviderStatus};

const NAME: &str = "heygen";

/// HeyGen talking-avatar videos. Text-to-video requests are voiced by the
/// default avatar reading the prompt.
#[derive(Clone)]
pub struct HeyGenProvider {
    client: Client,
    api_key: Option<ApiKey>,
    avatar_id: String,
    voice_id: String,
    media: MediaStorage,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    error: Option<Value>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Generated {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoStatus {
    status: String,
    video_url: Option<String>,
    error: Option<Value>,
}

enum Voice<'a> {
    Text { input: &'a str, voice_id: &'a str },
    Audio { url: &'a str },
}

fn describe(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

impl HeyGenProvider {
    pub fn new(
        client: Client,
        api_key: Option<ApiKey>,
        avatar_id: String,
        voice_id: String,
        media: MediaStorage,
    ) -> Self {
        Self {
            client,
            api_key,
            avatar_id,
            voice_id,
            media,
            base_url: "https://api.heygen.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn create(
        &self,
        key: &ApiKey,
        avatar_id: &str,
        voice: Voice<'_>,
        width: u32,
        height: u32,
    ) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let voice = match voice {
            Voice::Text { input, voice_id } => json!({ "type": "text", "input_text": input, "voice_id": voice_id }),
            Voice::Audio { url } => json!({ "type": "audio", "audio_url": url }),
        };
        let body = json!({
            "video_inputs": [{
                "character": { "type": "avatar", "avatar_id": avatar_id, "avatar_style": "normal" },
                "voice": voice
            }],
            "dimension": { "width": width, "height": height }
        });

        let response: Envelope<Generated> = send_json(
            self.client
                .post(format!("{}/v2/video/generate", self.base_url))
                .header("X-Api-Key", key.expose())
                .json(&body),
        )
        .await?;

        if let Some(error) = response.error.filter(|e| !e.is_null()) {
            return Err(ProviderError::Rejected(describe(&error)));
        }
        let video_id = response
            .data
            .map(|d| d.video_id)
            .ok_or_else(|| ProviderError::malformed("no video_id"))?;

        info!("🧑‍💼 HeyGen accepted video {}", video_id);
        Ok(ProviderResult::processing(video_id))
    }

    async fn status(&self, key: &ApiKey, video_id: &str) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let response: Envelope<VideoStatus> = send_json(
            self.client
                .get(format!("{}/v1/video_status.get", self.base_url))
                .header("X-Api-Key", key.expose())
                .query(&[("video_id", video_id)]),
        )
        .await?;

        let status = response
            .data
            .ok_or_else(|| ProviderError::malformed("status response has no data"))?;

        match normalize_status(&status.status) {
            ProviderStatus::Processing => Ok(ProviderResult::processing(video_id)),
            ProviderStatus::Error => Err(ProviderError::Rejected(
                status.error.as_ref().map(describe).unwrap_or(status.status),
            )),
            ProviderStatus::Success => {
                let url = status
                    .video_url
                    .ok_or_else(|| ProviderError::malformed("completed video has no url"))?;
                let output = mirror(&self.media, &url, MediaKind::Video, "mp4").await;
                Ok(ProviderResult::success(video_id, output))
            }
        }
    }
}

#[async_trait]
impl Provider<VideoRequest> for HeyGenProvider {
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
        let voice = Voice::Text {
            input: &request.prompt,
            voice_id: &self.voice_id,
        };
        settle(
            NAME,
            self.create(key, &self.avatar_id, voice, request.width, request.height).await,
        )
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.status(key, request_id).await)
    }
}

#[async_trait]
impl Provider<AvatarRequest> for HeyGenProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &AvatarRequest) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        let voice = match (&request.audio_url, &request.script) {
            (Some(url), _) => Voice::Audio { url },
            (None, Some(script)) => Voice::Text {
                input: script,
                voice_id: request.voice_id.as_deref().unwrap_or(&self.voice_id),
            },
            (None, None) => return ProviderResult::error("heygen: avatar video needs a script or audio"),
        };
        let avatar_id = request.avatar_id.as_deref().unwrap_or(&self.avatar_id);
        settle(
            NAME,
            self.create(key, avatar_id, voice, request.width, request.height).await,
        )
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.status(key, request_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, root: &std::path::Path) -> HeyGenProvider {
        let media = MediaStorage::new(Client::new(), root.join("renders"), root.join("images"), "http://x");
        HeyGenProvider::new(
            Client::new(),
            ApiKey::parse("hg-1"),
            "avatar-default".into(),
            "voice-default".into(),
            media,
        )
        .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn uploaded_audio_drives_the_avatar() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/video/generate"))
            .and(header("x-api-key", "hg-1"))
            .and(body_partial_json(serde_json::json!({
                "video_inputs": [{ "voice": { "type": "audio", "audio_url": "http://x/renders/audio/n.mp3" } }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "error": null, "data": { "video_id": "v-9" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let request = AvatarRequest {
            script: Some("ignored when audio exists".into()),
            audio_url: Some("http://x/renders/audio/n.mp3".into()),
            avatar_id: None,
            image_url: None,
            voice_id: None,
            width: 720,
            height: 1280,
        };
        let result = Provider::<AvatarRequest>::generate(&provider(&server, root.path()), &request).await;
        assert_eq!(result, ProviderResult::processing("v-9"));
    }

    #[tokio::test]
    async fn status_vocabulary_is_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .and(query_param("video_id", "v-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "status": "failed", "error": { "message": "avatar not found" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .and(query_param("video_id", "v-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "status": "processing" }
            })))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let heygen = provider(&server, root.path());

        let failed = Provider::<VideoRequest>::check_status(&heygen, "v-1").await;
        assert!(failed.error_message().unwrap_or_default().contains("avatar not found"));

        let pending = Provider::<VideoRequest>::check_status(&heygen, "v-2").await;
        assert_eq!(pending, ProviderResult::processing("v-2"));
    }
}
