use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::model::{AudioSource, Scene, Video, VideoStatus};
use crate::modules::providers::{ImageProvider, ProviderStatus, SpeechProvider, VideoProvider};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAiVideoRequest {
    #[validate(length(min = 3, max = 2000, message = "Prompt must be between 3 and 2000 characters"))]
    pub prompt: String,
    pub provider: VideoProvider,
    pub model: Option<String>,
    #[validate(range(min = 1, max = 60, message = "Duration must be between 1 and 60 seconds"))]
    pub duration: Option<u32>,
    #[validate(range(min = 256, max = 2160))]
    pub width: Option<u32>,
    #[validate(range(min = 256, max = 3840))]
    pub height: Option<u32>,
    #[validate(length(max = 255))]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiVideoResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
    pub request_id: String,
    /// Provider that accepted the job, which may differ from the requested one.
    pub provider: Option<VideoProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    pub provider: VideoProvider,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ProviderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAvatarRequest {
    pub audio_source: AudioSource,
    #[validate(length(min = 1, max = 5000))]
    pub script: Option<String>,
    #[validate(url)]
    pub audio_url: Option<String>,
    pub avatar_id: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    pub voice_id: Option<String>,
    pub speech_provider: Option<SpeechProvider>,
    #[validate(length(max = 255))]
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub caption: Option<String>,
    pub style: Option<String>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    pub image_provider: Option<ImageProvider>,
    pub speech_provider: Option<SpeechProvider>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub duration: i32,
    pub style: Option<String>,
    pub status: VideoStatus,
    /// Absolute URL of the finished video.
    pub video_url: Option<String>,
    pub scenes: Vec<Scene>,
    pub provider: Option<VideoProvider>,
    pub request_id: Option<String>,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl VideoResponse {
    pub fn from_video(video: Video, public_url: impl Fn(&str) -> String) -> Self {
        let remote = video.metadata.remote.clone();
        Self {
            id: video.id,
            video_url: video.video_url.as_deref().map(&public_url),
            error: video.metadata.last_error.clone(),
            provider: remote.as_ref().map(|r| r.provider),
            request_id: remote.map(|r| r.request_id),
            title: video.title,
            caption: video.caption,
            duration: video.duration,
            style: video.style,
            status: video.status,
            scenes: video.scenes.0,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoEnvelope {
    pub video: VideoResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoList {
    pub videos: Vec<VideoResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub video_id: Uuid,
    pub status: VideoStatus,
}
