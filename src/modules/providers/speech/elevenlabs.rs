use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::common::media::{MediaKind, MediaStorage};
use crate::config::settings::ApiKey;
use crate::modules::providers::http::send_bytes;
use crate::modules::providers::requests::SpeechRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const NAME: &str = "elevenlabs";

#[derive(Clone)]
pub struct ElevenLabsSpeechProvider {
    client: Client,
    api_key: Option<ApiKey>,
    default_voice: String,
    media: MediaStorage,
    base_url: String,
}

impl ElevenLabsSpeechProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, default_voice: String, media: MediaStorage) -> Self {
        Self {
            client,
            api_key,
            default_voice,
            media,
            base_url: "https://api.elevenlabs.io/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn speak(&self, key: &ApiKey, request: &SpeechRequest) -> Result<ProviderResult<MediaOutput>, ProviderError> {
        let voice = request.voice_id.as_deref().unwrap_or(&self.default_voice);
        let audio = send_bytes(
            self.client
                .post(format!("{}/text-to-speech/{}", self.base_url, voice))
                .header("xi-api-key", key.expose())
                .header("Accept", "audio/mpeg")
                .json(&json!({
                    "text": request.text,
                    "model_id": "eleven_multilingual_v2",
                    "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 }
                })),
        )
        .await?;

        let stored = self
            .media
            .write_bytes(MediaKind::Audio, &format!("{}.mp3", request.file_stem), &audio)
            .await?;
        info!("🗣️ ElevenLabs narration stored at {}", stored.public_path);

        let url = self.media.public_url(&stored.public_path);
        Ok(ProviderResult::success(
            format!("elevenlabs-{}", request.file_stem),
            MediaOutput::stored(url, stored),
        ))
    }
}

#[async_trait]
impl Provider<SpeechRequest> for ElevenLabsSpeechProvider {
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
