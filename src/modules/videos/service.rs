use tracing::{error, info};
use uuid::Uuid;

use super::dto::{
    AiVideoResponse, CreateAiVideoRequest, CreateAvatarRequest, CreateVideoRequest, RenderResponse, StatusResponse,
    VideoResponse,
};
use super::model::{AudioSource, JobKind, JobMetadata, NewVideo, Video, VideoStatus};
use super::repository::VideoStore;
use crate::common::error::{AppError, AppResult};
use crate::modules::providers::dispatcher::Dispatched;
use crate::modules::providers::requests::{AvatarRequest, SpeechRequest, VideoRequest};
use crate::modules::providers::{MediaOutput, ProviderResult, VideoProvider};
use crate::state::AppState;

const DEFAULT_WIDTH: u32 = 720;
const DEFAULT_HEIGHT: u32 = 1280;
const DEFAULT_CLIP_SECONDS: u32 = 5;

pub struct VideoService;

/// First few words of a prompt, for untitled jobs.
fn title_from(text: &str) -> String {
    let mut title: String = text.split_whitespace().take(8).collect::<Vec<_>>().join(" ");
    if title.chars().count() > 60 {
        title = title.chars().take(60).collect();
    }
    if title.is_empty() { "Untitled video".to_string() } else { title }
}

impl VideoService {
    /// Loads a video the user owns; anyone else's video is reported as missing.
    pub async fn owned_video(videos: &dyn VideoStore, user_id: Uuid, video_id: Uuid) -> AppResult<Video> {
        videos
            .find(video_id)
            .await?
            .filter(|v| v.user_id == user_id)
            .ok_or_else(|| AppError::not_found("Video not found"))
    }

    /// Stores a freshly dispatched job: completed when the provider answered
    /// synchronously, processing (and polled later) otherwise.
    async fn record_dispatch(
        state: &AppState,
        user_id: Uuid,
        title: String,
        duration: u32,
        metadata: JobMetadata,
        dispatched: Dispatched<VideoProvider, MediaOutput>,
    ) -> AppResult<AiVideoResponse> {
        let (status, request_id, video_url) = match dispatched.result {
            ProviderResult::Error { error } => return Err(AppError::Provider(error)),
            ProviderResult::Processing { request_id } => (VideoStatus::Processing, request_id, None),
            ProviderResult::Success { request_id, output } => (
                VideoStatus::Completed,
                request_id,
                Some(output.preferred_location().to_string()),
            ),
        };
        let provider = dispatched
            .provider
            .ok_or_else(|| AppError::Provider("no video provider accepted the job".to_string()))?;

        let video = state
            .videos
            .create(NewVideo {
                user_id,
                title,
                caption: None,
                duration: duration as i32,
                style: Some("ai".to_string()),
                status,
                video_url,
                scenes: Vec::new(),
                metadata: metadata.with_remote(provider, request_id.clone()),
            })
            .await?;

        info!("🎬 Video {} dispatched to {} ({})", video.id, provider, status.as_str());
        Ok(AiVideoResponse {
            video_id: video.id,
            status: video.status,
            request_id,
            provider: Some(provider),
            video_url: video.video_url.as_deref().map(|u| state.media.public_url(u)),
        })
    }

    pub async fn create_ai_video(
        state: &AppState,
        user_id: Uuid,
        req: CreateAiVideoRequest,
    ) -> AppResult<AiVideoResponse> {
        let request = VideoRequest {
            prompt: req.prompt.trim().to_string(),
            model: req.model.clone(),
            duration: req.duration.unwrap_or(DEFAULT_CLIP_SECONDS),
            width: req.width.unwrap_or(DEFAULT_WIDTH),
            height: req.height.unwrap_or(DEFAULT_HEIGHT),
        };

        let dispatched = state.providers.video.dispatch(Some(req.provider), &request).await;
        let metadata = JobMetadata::new(JobKind::AiVideo {
            prompt: request.prompt.clone(),
            model: request.model.clone(),
            duration: request.duration,
            width: request.width,
            height: request.height,
        });
        let title = req.title.unwrap_or_else(|| title_from(&request.prompt));

        Self::record_dispatch(state, user_id, title, request.duration, metadata, dispatched).await
    }

    /// Asks the provider for a job's status and applies the answer to the
    /// matching row, if the caller owns one.
    pub async fn check_ai_video_status(
        state: &AppState,
        user_id: Uuid,
        provider: VideoProvider,
        request_id: &str,
    ) -> AppResult<StatusResponse> {
        let row = state.videos.find_by_request_id(provider, request_id).await?;
        if row.as_ref().is_some_and(|v| v.user_id != user_id) {
            return Err(AppError::not_found("Video not found"));
        }

        let result = state.providers.check_video_status(provider, request_id).await;

        let mut video_id = None;
        let mut video_url = match &result {
            ProviderResult::Success { output, .. } => Some(state.media.public_url(output.preferred_location())),
            _ => None,
        };

        if let Some(mut video) = row {
            video_id = Some(video.id);
            if video.status == VideoStatus::Processing {
                video.apply_status(&result, false);
                state.videos.update(&video).await?;
            }
            if let Some(url) = &video.video_url {
                video_url = Some(state.media.public_url(url));
            }
        }

        Ok(StatusResponse {
            status: result.status(),
            video_id,
            video_url,
            error: result.error_message().map(str::to_string),
        })
    }

    pub async fn create_avatar_video(
        state: &AppState,
        user_id: Uuid,
        req: CreateAvatarRequest,
    ) -> AppResult<AiVideoResponse> {
        let script = req.script.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let audio_url = match req.audio_source {
            AudioSource::Upload => req
                .audio_url
                .clone()
                .ok_or_else(|| AppError::bad_request("audioUrl is required when audioSource is 'upload'"))?,
            AudioSource::Tts => {
                let text = script.ok_or_else(|| AppError::bad_request("script is required when audioSource is 'tts'"))?;
                let speech = SpeechRequest {
                    text: text.to_string(),
                    voice_id: req.voice_id.clone(),
                    file_stem: format!("avatar-{}", Uuid::new_v4()),
                };
                match state.providers.speech.dispatch(req.speech_provider, &speech).await.result {
                    ProviderResult::Success { output, .. } => state.media.public_url(output.preferred_location()),
                    ProviderResult::Error { error } => return Err(AppError::Provider(error)),
                    ProviderResult::Processing { .. } => {
                        return Err(AppError::Provider("narration is still being generated".to_string()));
                    }
                }
            }
        };

        let request = AvatarRequest {
            script: script.map(str::to_string),
            audio_url: Some(audio_url.clone()),
            avatar_id: req.avatar_id.clone(),
            image_url: req.image_url.clone(),
            voice_id: req.voice_id.clone(),
            width: req.width.unwrap_or(DEFAULT_WIDTH),
            height: req.height.unwrap_or(DEFAULT_HEIGHT),
        };
        let dispatched = state.providers.avatar.dispatch(None, &request).await;

        let metadata = JobMetadata::new(JobKind::Avatar {
            script: request.script.clone(),
            audio_source: req.audio_source,
            audio_url: Some(audio_url),
        });
        let title = req
            .title
            .unwrap_or_else(|| title_from(request.script.as_deref().unwrap_or("Avatar video")));

        Self::record_dispatch(state, user_id, title, 0, metadata, dispatched).await
    }

    pub async fn create_video(state: &AppState, user_id: Uuid, req: CreateVideoRequest) -> AppResult<VideoResponse> {
        if req.scenes.iter().any(|s| s.duration == 0) {
            return Err(AppError::bad_request("Scene duration must be at least one second"));
        }
        let duration: u32 = req.scenes.iter().map(|s| s.duration).sum();

        let mut metadata = JobMetadata::new(JobKind::Manual);
        metadata.image_provider = req.image_provider;
        metadata.speech_provider = req.speech_provider;

        let video = state
            .videos
            .create(NewVideo {
                user_id,
                title: req.title.trim().to_string(),
                caption: req.caption,
                duration: duration as i32,
                style: req.style,
                status: VideoStatus::Draft,
                video_url: None,
                scenes: req.scenes,
                metadata,
            })
            .await?;

        Ok(VideoResponse::from_video(video, |u| state.media.public_url(u)))
    }

    pub async fn list_videos(state: &AppState, user_id: Uuid) -> AppResult<Vec<VideoResponse>> {
        let videos = state.videos.list_for_user(user_id).await?;
        Ok(videos
            .into_iter()
            .map(|v| VideoResponse::from_video(v, |u| state.media.public_url(u)))
            .collect())
    }

    pub async fn get_video(state: &AppState, user_id: Uuid, video_id: Uuid) -> AppResult<VideoResponse> {
        let video = Self::owned_video(state.videos.as_ref(), user_id, video_id).await?;
        Ok(VideoResponse::from_video(video, |u| state.media.public_url(u)))
    }

    /// Marks the video as generating and renders it in the background.
    pub async fn render_video(state: &AppState, user_id: Uuid, video_id: Uuid) -> AppResult<RenderResponse> {
        let mut video = Self::owned_video(state.videos.as_ref(), user_id, video_id).await?;
        if video.status.is_busy() {
            return Err(AppError::conflict(format!("Video is already {}", video.status.as_str())));
        }
        if video.status.is_scheduled() {
            return Err(AppError::conflict(format!(
                "Video is {}; remove it from the queue before rendering again",
                video.status.as_str()
            )));
        }
        if video.scenes.is_empty() {
            return Err(AppError::bad_request("Video has no scenes to render"));
        }

        video.status = VideoStatus::Generating;
        video.metadata.last_error = None;
        state.videos.update(&video).await?;

        let renderer = state.renderer.clone();
        tokio::spawn(async move {
            let id = video.id;
            if let Err(e) = renderer.run(video).await {
                error!("❌ Could not record render result for video {}: {:#}", id, e);
            }
        });

        Ok(RenderResponse {
            video_id,
            status: VideoStatus::Generating,
        })
    }
}
