use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::common::response::ErrorBody;
use crate::modules::auth::dto::{AuthResponse, LoginRequest, RegisterRequest, UserEnvelope, UserResponse};
use crate::modules::media::dto::{ImageGenerationRequest, MediaResponse, SpeechGenerationRequest};
use crate::modules::providers::{ImageProvider, ProviderStatus, ScriptProvider, SpeechProvider, VideoProvider};
use crate::modules::queue::dto::{
    EnqueueRequest, QueueEntryResponse, QueueEnvelope, QueueList, RemovedResponse, UpdateQueueRequest,
};
use crate::modules::queue::model::{PlatformFailure, PlatformSuccess, QueueMetadata, QueueStatus};
use crate::modules::social::dto::{AccountList, AccountResponse, ConnectResponse, DisconnectResponse, PlatformSummary};
use crate::modules::social::model::Platform;
use crate::modules::topic::dto::{GeneratedScript, ScriptLength, ScriptRequestBody, ScriptResponse, ScriptSections};
use crate::modules::videos::dto::{
    AiVideoResponse, CreateAiVideoRequest, CreateAvatarRequest, CreateVideoRequest, RenderResponse, StatusResponse,
    VideoEnvelope, VideoList, VideoResponse,
};
use crate::modules::videos::model::{AudioSource, Background, Scene, VideoStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::handler::register,
        crate::modules::auth::handler::login,
        crate::modules::auth::handler::logout,
        crate::modules::auth::handler::me,
        crate::modules::videos::handler::create_ai_video,
        crate::modules::videos::handler::ai_video_status,
        crate::modules::videos::handler::create_avatar_video,
        crate::modules::videos::handler::create_video,
        crate::modules::videos::handler::list_videos,
        crate::modules::videos::handler::get_video,
        crate::modules::videos::handler::render_video,
        crate::modules::topic::handler::generate_script,
        crate::modules::media::handler::generate_image,
        crate::modules::media::handler::generate_speech,
        crate::modules::queue::handler::enqueue,
        crate::modules::queue::handler::list_queue,
        crate::modules::queue::handler::update_entry,
        crate::modules::queue::handler::remove_entry,
        crate::modules::queue::handler::post_now,
        crate::modules::social::handler::connect,
        crate::modules::social::handler::oauth_callback,
        crate::modules::social::handler::list_accounts,
        crate::modules::social::handler::disconnect,
    ),
    components(
        schemas(
            ErrorBody,
            RegisterRequest, LoginRequest, AuthResponse, UserResponse, UserEnvelope,
            CreateAiVideoRequest, AiVideoResponse, StatusResponse, CreateAvatarRequest, CreateVideoRequest,
            VideoResponse, VideoEnvelope, VideoList, RenderResponse,
            VideoStatus, Scene, Background, AudioSource,
            ScriptRequestBody, ScriptLength, ScriptResponse, GeneratedScript, ScriptSections,
            ImageGenerationRequest, SpeechGenerationRequest, MediaResponse,
            EnqueueRequest, UpdateQueueRequest, QueueEntryResponse, QueueEnvelope, QueueList, RemovedResponse,
            QueueStatus, QueueMetadata, PlatformSuccess, PlatformFailure,
            Platform, ConnectResponse, AccountResponse, AccountList, PlatformSummary, DisconnectResponse,
            ScriptProvider, ImageProvider, VideoProvider, SpeechProvider, ProviderStatus,
        )
    ),
    tags(
        (name = "Auth", description = "Accounts and sessions"),
        (name = "Videos", description = "Video jobs and rendering"),
        (name = "Topic", description = "Script generation"),
        (name = "Media", description = "Standalone image and speech generation"),
        (name = "Queue", description = "Scheduled posting"),
        (name = "Social", description = "Linked YouTube and Instagram accounts")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/api/auth/login",
            "/api/videos/ai-video",
            "/api/topic/script",
            "/api/media/image",
            "/api/queue/{queue_id}/post-now",
            "/api/auth/callback/{platform}",
            "/api/social/accounts",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }
}
