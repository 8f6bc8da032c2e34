use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    /// Subject of the script, used by the offline template.
    pub topic: String,
    pub target_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRequest {
    pub fn portrait(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: 1080,
            height: 1920,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarRequest {
    /// Spoken text, used when the provider voices the avatar itself.
    pub script: Option<String>,
    /// Publicly reachable narration track.
    pub audio_url: Option<String>,
    pub avatar_id: Option<String>,
    pub image_url: Option<String>,
    pub voice_id: Option<String>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: Option<String>,
    /// File stem for the stored audio.
    pub file_stem: String,
}
