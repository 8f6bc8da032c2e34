use std::sync::Arc;

use reqwest::Client;

use super::dispatcher::FallbackDispatcher;
use super::image::{GradientImageProvider, OpenAiImageProvider, PexelsImageProvider, StabilityImageProvider};
use super::requests::{AvatarRequest, ImageRequest, ScriptRequest, SpeechRequest, VideoRequest};
use super::script::{ChatCompletionsProvider, GeminiScriptProvider, TemplateScriptProvider};
use super::speech::{ElevenLabsSpeechProvider, OpenAiSpeechProvider};
use super::video::{BytezVideoProvider, FalVideoProvider, HeyGenProvider, ReplicateVideoProvider, SkyReelsProvider};
use super::{ImageProvider, MediaOutput, ProviderResult, ScriptProvider, SpeechProvider, VideoProvider};
use crate::common::media::MediaStorage;
use crate::config::settings::AppConfig;

pub type ScriptDispatcher = FallbackDispatcher<ScriptProvider, ScriptRequest, String>;
pub type ImageDispatcher = FallbackDispatcher<ImageProvider, ImageRequest, MediaOutput>;
pub type VideoDispatcher = FallbackDispatcher<VideoProvider, VideoRequest, MediaOutput>;
pub type AvatarDispatcher = FallbackDispatcher<VideoProvider, AvatarRequest, MediaOutput>;
pub type SpeechDispatcher = FallbackDispatcher<SpeechProvider, SpeechRequest, MediaOutput>;

/// Every provider the service can talk to, one dispatcher per service.
pub struct ProviderRegistry {
    pub script: ScriptDispatcher,
    pub image: ImageDispatcher,
    pub video: VideoDispatcher,
    pub avatar: AvatarDispatcher,
    pub speech: SpeechDispatcher,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig, client: &Client, media: &MediaStorage) -> Self {
        let keys = &config.keys;
        let models = &config.models;

        let script = ScriptDispatcher::new("script")
            .with(
                ScriptProvider::Gemini,
                Arc::new(GeminiScriptProvider::new(client.clone(), keys.gemini.clone(), models.gemini.clone())),
            )
            .with(
                ScriptProvider::Groq,
                Arc::new(ChatCompletionsProvider::groq(client.clone(), keys.groq.clone(), models.groq.clone())),
            )
            .with(
                ScriptProvider::OpenAi,
                Arc::new(ChatCompletionsProvider::openai(
                    client.clone(),
                    keys.openai.clone(),
                    models.openai.clone(),
                )),
            )
            .with_placeholder(Arc::new(TemplateScriptProvider));

        let image = ImageDispatcher::new("image")
            .with(
                ImageProvider::Pexels,
                Arc::new(PexelsImageProvider::new(client.clone(), keys.pexels.clone(), media.clone())),
            )
            .with(
                ImageProvider::Stability,
                Arc::new(StabilityImageProvider::new(client.clone(), keys.stability.clone(), media.clone())),
            )
            .with(
                ImageProvider::OpenAi,
                Arc::new(OpenAiImageProvider::new(client.clone(), keys.openai.clone(), media.clone())),
            )
            .with_placeholder(Arc::new(GradientImageProvider::new(media.clone())));

        let heygen = Arc::new(HeyGenProvider::new(
            client.clone(),
            keys.heygen.clone(),
            models.heygen_avatar_id.clone(),
            models.heygen_voice_id.clone(),
            media.clone(),
        ));
        let skyreels = Arc::new(SkyReelsProvider::new(client.clone(), keys.skyreels.clone(), media.clone()));

        let video = VideoDispatcher::new("video")
            .with(
                VideoProvider::Fal,
                Arc::new(FalVideoProvider::new(
                    client.clone(),
                    keys.fal.clone(),
                    models.fal.clone(),
                    media.clone(),
                )),
            )
            .with(
                VideoProvider::Replicate,
                Arc::new(ReplicateVideoProvider::new(
                    client.clone(),
                    keys.replicate.clone(),
                    models.replicate.clone(),
                    media.clone(),
                )),
            )
            .with(
                VideoProvider::Bytez,
                Arc::new(BytezVideoProvider::new(
                    client.clone(),
                    keys.bytez.clone(),
                    models.bytez.clone(),
                    media.clone(),
                )),
            )
            .with(VideoProvider::HeyGen, heygen.clone())
            .with(VideoProvider::SkyReels, skyreels.clone());

        let avatar = AvatarDispatcher::new("avatar")
            .with(VideoProvider::SkyReels, skyreels)
            .with(VideoProvider::HeyGen, heygen);

        let speech = SpeechDispatcher::new("speech")
            .with(
                SpeechProvider::ElevenLabs,
                Arc::new(ElevenLabsSpeechProvider::new(
                    client.clone(),
                    keys.elevenlabs.clone(),
                    models.elevenlabs_voice_id.clone(),
                    media.clone(),
                )),
            )
            .with(
                SpeechProvider::OpenAi,
                Arc::new(OpenAiSpeechProvider::new(client.clone(), keys.openai.clone(), media.clone())),
            );

        Self {
            script,
            image,
            video,
            avatar,
            speech,
        }
    }

    /// Polls an async video job. Avatar jobs land here too: their providers
    /// are registered for both request kinds.
    pub async fn check_video_status(&self, provider: VideoProvider, request_id: &str) -> ProviderResult<MediaOutput> {
        match self.video.get(provider) {
            Some(adapter) if adapter.is_available() => adapter.check_status(request_id).await,
            Some(_) => ProviderResult::unavailable(provider.as_str()),
            None => ProviderResult::error(format!("{provider} is not a registered video provider")),
        }
    }
}
