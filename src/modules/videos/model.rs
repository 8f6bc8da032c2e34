use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::providers::{ImageProvider, MediaOutput, ProviderResult, SpeechProvider, VideoProvider};

/// Status checks allowed per remote job before it is failed as timed out.
pub const MAX_STATUS_CHECKS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "video_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Draft,
    Processing,
    Generating,
    Completed,
    Failed,
    Queued,
    Posted,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Draft => "draft",
            VideoStatus::Processing => "processing",
            VideoStatus::Generating => "generating",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Queued => "queued",
            VideoStatus::Posted => "posted",
        }
    }

    /// A provider or the renderer is still working on it.
    pub fn is_busy(&self) -> bool {
        matches!(self, VideoStatus::Processing | VideoStatus::Generating)
    }

    /// Handed to the posting queue; the rendered file must stay as is.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, VideoStatus::Queued | VideoStatus::Posted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Background {
    Color { value: String },
    Image { url: String },
    /// Resolved to an image by the image providers at render time.
    Prompt { text: String },
}

impl Default for Background {
    fn default() -> Self {
        Background::Color {
            value: "#101820".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub narration: String,
    #[serde(default)]
    pub text_overlay: Option<String>,
    /// Seconds.
    pub duration: u32,
    #[serde(default)]
    pub background: Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    Tts,
    Upload,
}

/// What produced the video; each kind keeps its own inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    AiVideo {
        prompt: String,
        model: Option<String>,
        duration: u32,
        width: u32,
        height: u32,
    },
    Avatar {
        script: Option<String>,
        audio_source: AudioSource,
        audio_url: Option<String>,
    },
    Script {
        topic: String,
        niche: Option<String>,
        tone: Option<String>,
        language: Option<String>,
        hashtags: Vec<String>,
    },
    Manual,
}

/// An external job the status poller follows. Provider and request id only
/// exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteJob {
    pub provider: VideoProvider,
    pub request_id: String,
    #[serde(default)]
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job: JobKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_provider: Option<ImageProvider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_provider: Option<SpeechProvider>,
}

impl JobMetadata {
    pub fn new(job: JobKind) -> Self {
        Self {
            job,
            remote: None,
            last_error: None,
            image_provider: None,
            speech_provider: None,
        }
    }

    pub fn with_remote(mut self, provider: VideoProvider, request_id: impl Into<String>) -> Self {
        self.remote = Some(RemoteJob {
            provider,
            request_id: request_id.into(),
            attempts: 0,
        });
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub duration: i32,
    pub style: Option<String>,
    pub status: VideoStatus,
    /// `/renders/...` for local copies, the provider URL otherwise.
    pub video_url: Option<String>,
    pub scenes: Json<Vec<Scene>>,
    pub metadata: Json<JobMetadata>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub user_id: Uuid,
    pub title: String,
    pub caption: Option<String>,
    pub duration: i32,
    pub style: Option<String>,
    pub status: VideoStatus,
    pub video_url: Option<String>,
    pub scenes: Vec<Scene>,
    pub metadata: JobMetadata,
}

/// What a status check did to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    TimedOut,
    StillProcessing,
}

impl Video {
    pub fn remote(&self) -> Option<&RemoteJob> {
        self.metadata.remote.as_ref()
    }

    /// Can be handed to a social platform.
    pub fn is_publishable(&self) -> bool {
        self.video_url.is_some()
            && matches!(
                self.status,
                VideoStatus::Completed | VideoStatus::Queued | VideoStatus::Posted
            )
    }

    /// Applies one provider status check. `count_attempt` is false for checks
    /// a user triggers by hand, which must not use up the poller's budget.
    pub fn apply_status(&mut self, result: &ProviderResult<MediaOutput>, count_attempt: bool) -> PollOutcome {
        match result {
            ProviderResult::Success { output, .. } => {
                self.status = VideoStatus::Completed;
                self.video_url = Some(output.preferred_location().to_string());
                self.metadata.last_error = None;
                if let Some(remote) = self.metadata.remote.as_mut() {
                    remote.attempts = 0;
                }
                PollOutcome::Completed
            }
            ProviderResult::Error { error } => {
                self.status = VideoStatus::Failed;
                self.metadata.last_error = Some(error.clone());
                PollOutcome::Failed
            }
            ProviderResult::Processing { .. } => {
                if !count_attempt {
                    return PollOutcome::StillProcessing;
                }
                let Some(remote) = self.metadata.remote.as_mut() else {
                    return PollOutcome::StillProcessing;
                };
                remote.attempts += 1;
                if remote.attempts >= MAX_STATUS_CHECKS {
                    let message = format!(
                        "{} job {} timed out after {} status checks",
                        remote.provider, remote.request_id, remote.attempts
                    );
                    self.status = VideoStatus::Failed;
                    self.metadata.last_error = Some(message);
                    PollOutcome::TimedOut
                } else {
                    PollOutcome::StillProcessing
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_video(user_id: Uuid, status: VideoStatus, metadata: JobMetadata) -> Video {
    let now = OffsetDateTime::now_utc();
    Video {
        id: Uuid::new_v4(),
        user_id,
        title: "Sample".to_string(),
        caption: Some("A sample clip".to_string()),
        duration: 30,
        style: None,
        status,
        video_url: None,
        scenes: Json(Vec::new()),
        metadata: Json(metadata),
        created_at: now,
        updated_at: now,
    }
}
