use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    RedisUrl,
    JwtSecret,
    BackendUrl,
    FrontendUrl,
    RendersDir,
    ImagesDir,
    StatusPollIntervalSecs,
    AutoPostIntervalSecs,

    GeminiApiKey,
    GeminiModel,
    GroqApiKey,
    GroqModel,
    OpenAiApiKey,
    OpenAiModel,
    PexelsApiKey,
    StabilityApiKey,
    BytezApiKey,
    BytezModel,
    FalApiKey,
    FalModel,
    ReplicateApiKey,
    ReplicateModel,
    HeyGenApiKey,
    HeyGenAvatarId,
    HeyGenVoiceId,
    SkyReelsApiKey,
    ElevenLabsApiKey,
    ElevenLabsVoiceId,

    YouTubeClientId,
    YouTubeClientSecret,
    YouTubeRedirectUri,
    InstagramClientId,
    InstagramClientSecret,
    InstagramRedirectUri,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::JwtSecret => "JWT_SECRET",
            EnvKey::BackendUrl => "BACKEND_URL",
            EnvKey::FrontendUrl => "FRONTEND_URL",
            EnvKey::RendersDir => "RENDERS_DIR",
            EnvKey::ImagesDir => "IMAGES_DIR",
            EnvKey::StatusPollIntervalSecs => "STATUS_POLL_INTERVAL_SECS",
            EnvKey::AutoPostIntervalSecs => "AUTO_POST_INTERVAL_SECS",

            EnvKey::GeminiApiKey => "GEMINI_API_KEY",
            EnvKey::GeminiModel => "GEMINI_MODEL",
            EnvKey::GroqApiKey => "GROQ_API_KEY",
            EnvKey::GroqModel => "GROQ_MODEL",
            EnvKey::OpenAiApiKey => "OPENAI_API_KEY",
            EnvKey::OpenAiModel => "OPENAI_MODEL",
            EnvKey::PexelsApiKey => "PEXELS_API_KEY",
            EnvKey::StabilityApiKey => "STABILITY_API_KEY",
            EnvKey::BytezApiKey => "BYTEZ_API_KEY",
            EnvKey::BytezModel => "BYTEZ_VIDEO_MODEL",
            EnvKey::FalApiKey => "FAL_API_KEY",
            EnvKey::FalModel => "FAL_VIDEO_MODEL",
            EnvKey::ReplicateApiKey => "REPLICATE_API_KEY",
            EnvKey::ReplicateModel => "REPLICATE_VIDEO_MODEL",
            EnvKey::HeyGenApiKey => "HEYGEN_API_KEY",
            EnvKey::HeyGenAvatarId => "HEYGEN_AVATAR_ID",
            EnvKey::HeyGenVoiceId => "HEYGEN_VOICE_ID",
            EnvKey::SkyReelsApiKey => "SKYREELS_API_KEY",
            EnvKey::ElevenLabsApiKey => "ELEVENLABS_API_KEY",
            EnvKey::ElevenLabsVoiceId => "ELEVENLABS_VOICE_ID",

            EnvKey::YouTubeClientId => "YOUTUBE_CLIENT_ID",
            EnvKey::YouTubeClientSecret => "YOUTUBE_CLIENT_SECRET",
            EnvKey::YouTubeRedirectUri => "YOUTUBE_REDIRECT_URI",
            EnvKey::InstagramClientId => "INSTAGRAM_CLIENT_ID",
            EnvKey::InstagramClientSecret => "INSTAGRAM_CLIENT_SECRET",
            EnvKey::InstagramRedirectUri => "INSTAGRAM_REDIRECT_URI",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
