use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::send_bytes;
use crate::modules::providers::requests::SpeechRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "openai";
const DEFAULT_VOICE: &str = "alloy";

#[derive(Clone)]
pub struct OpenAiSpeechProvider {
    client: Client,
    api_key: Option<ApiKey>,
    media: MediaStorage,
    base_url: String,
}

impl OpenAiSpeechProvider {
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

    async fn speak(&self, key: &ApiKey, request: &SpeechRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        // ElevenLabs voice ids mean nothing here.
        let voice = request
            .voice_id
            .as_deref()
            .filter(|v| ["alloy", "echo", "fable", "onyx", "nova", "shimmer"].contains(v))
            .unwrap_or(DEFAULT_VOICE);

        let audio = send_bytes(
            self.client
                .post(format!("{}/audio/speech", self.base_url))
                .bearer_auth(key.expose())
                .json(&json!({
                    "model": "tts-1",
                    "input": request.text,
                    "voice": voice,
                    "response_format": "mp3"
                })),
        )
        .await?;

        let stored = self
            .media
            .write_bytes(MediaKind::Audio, &format!("{}.mp3", request.file_stem), &audio)
            .await?;
        let url = self.media.public_url(&stored.public_path);
        Ok(ProviderResult::success(
            format!("openai-tts-{}", request.file_stem),
            MediaOutput::stored(url, stored),
        ))
    }
}

#[async_trait]
impl Provider<SpeechRequest> for OpenAiSpeechProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &SpeechRequest) -> ProviderResult<MediaOutput> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.speak(key, request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn unknown_voice_falls_back_to_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(serde_json::json!({ "model": "tts-1", "voice": "alloy" })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(Client::new(), root.path().join("r"), root.path().join("i"), "http://x");
        let provider = OpenAiSpeechProvider::new(Client::new(), ApiKey::parse("sk-1"), media)
            .with_base_url(&server.uri());

        let result = provider
            .generate(&SpeechRequest {
                text: "hi".into(),
                voice_id: Some("21m00Tcm4TlvDq8ikWAM".into()),
                file_stem: "n".into(),
            })
            .await;
        assert!(!result.is_error(), "{result:?}");
    }
}
