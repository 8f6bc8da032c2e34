use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::providers::{ImageProvider, SpeechProvider};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ImageGenerationRequest {
    #[validate(length(min = 2, max = 1000, message = "Prompt must be between 2 and 1000 characters"))]
    pub prompt: String,
    pub provider: Option<ImageProvider>,
    #[validate(range(min = 64, max = 4096))]
    pub width: Option<u32>,
    #[validate(range(min = 64, max = 4096))]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpeechGenerationRequest {
    #[validate(length(min = 1, max = 5000, message = "Text must be between 1 and 5000 characters"))]
    pub text: String,
    #[validate(length(max = 100))]
    pub voice_id: Option<String>,
    pub provider: Option<SpeechProvider>,
}

/// A generated file. `provider` is `None` for the local placeholder image.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub url: String,
    pub request_id: String,
    pub provider: Option<String>,
}
