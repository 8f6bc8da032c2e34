use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::{self, EnvKey};

/// A provider credential that is known to be usable.
///
/// Empty values and the placeholders shipped in `.env.example` files never
/// become an `ApiKey`, so adapters treat them exactly like a missing key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Option<Self> {
        let value = raw.trim();
        if value.is_empty() || is_placeholder(value) {
            return None;
        }
        Some(Self(value.to_string()))
    }

    fn from_env(key: EnvKey) -> Option<Self> {
        env::get_opt(key).and_then(|v| Self::parse(&v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("your_")
        || lower.starts_with("your-")
        || lower.starts_with("xxx")
        || lower.contains("api_key_here")
        || matches!(lower.as_str(), "changeme" | "placeholder" | "none" | "null")
}

#[derive(Clone, Debug, Default)]
pub struct ProviderKeys {
    pub gemini: Option<ApiKey>,
    pub groq: Option<ApiKey>,
    pub openai: Option<ApiKey>,
    pub pexels: Option<ApiKey>,
    pub stability: Option<ApiKey>,
    pub bytez: Option<ApiKey>,
    pub fal: Option<ApiKey>,
    pub replicate: Option<ApiKey>,
    pub heygen: Option<ApiKey>,
    pub skyreels: Option<ApiKey>,
    pub elevenlabs: Option<ApiKey>,
}

#[derive(Clone, Debug)]
pub struct ProviderModels {
    pub gemini: String,
    pub groq: String,
    pub openai: String,
    pub bytez: String,
    pub fal: String,
    pub replicate: String,
    pub heygen_avatar_id: String,
    pub heygen_voice_id: String,
    pub elevenlabs_voice_id: String,
}

impl Default for ProviderModels {
    fn default() -> Self {
        Self {
            gemini: "gemini-1.5-flash".to_string(),
            groq: "llama-3.1-70b-versatile".to_string(),
            openai: "gpt-4o-mini".to_string(),
            bytez: "ali-vilab/text-to-video-ms-1.7b".to_string(),
            fal: "fal-ai/fast-svd/text-to-video".to_string(),
            replicate: "minimax/video-01".to_string(),
            heygen_avatar_id: "Daisy-inskirt-20220818".to_string(),
            heygen_voice_id: "2d5b0e6cf36f460aa7fc47e3eee4ba54".to_string(),
            elevenlabs_voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    fn from_env(id: EnvKey, secret: EnvKey, redirect: EnvKey) -> Option<Self> {
        Some(Self {
            client_id: env::get_opt(id)?,
            client_secret: env::get_opt(secret)?,
            redirect_uri: env::get_opt(redirect)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub backend_url: String,
    pub frontend_url: String,
    pub renders_dir: PathBuf,
    pub images_dir: PathBuf,
    pub status_poll_interval: Duration,
    pub auto_post_interval: Duration,
    pub keys: ProviderKeys,
    pub models: ProviderModels,
    pub youtube: Option<OAuthClientConfig>,
    pub instagram: Option<OAuthClientConfig>,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        let port: u16 = env::get_parsed(EnvKey::ServerPort, 3000);
        let defaults = ProviderModels::default();

        Ok(Self {
            server_port: port,
            database_url: env::get(EnvKey::DatabaseUrl)?,
            redis_url: env::get(EnvKey::RedisUrl)?,
            jwt_secret: env::get(EnvKey::JwtSecret)?,
            backend_url: env::get_or(EnvKey::BackendUrl, &format!("http://localhost:{port}"))
                .trim_end_matches('/')
                .to_string(),
            frontend_url: env::get_or(EnvKey::FrontendUrl, "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            renders_dir: PathBuf::from(env::get_or(EnvKey::RendersDir, "./renders")),
            images_dir: PathBuf::from(env::get_or(EnvKey::ImagesDir, "./images")),
            status_poll_interval: Duration::from_secs(env::get_parsed(
                EnvKey::StatusPollIntervalSecs,
                30,
            )),
            auto_post_interval: Duration::from_secs(env::get_parsed(
                EnvKey::AutoPostIntervalSecs,
                60,
            )),
            keys: ProviderKeys {
                gemini: ApiKey::from_env(EnvKey::GeminiApiKey),
                groq: ApiKey::from_env(EnvKey::GroqApiKey),
                openai: ApiKey::from_env(EnvKey::OpenAiApiKey),
                pexels: ApiKey::from_env(EnvKey::PexelsApiKey),
                stability: ApiKey::from_env(EnvKey::StabilityApiKey),
                bytez: ApiKey::from_env(EnvKey::BytezApiKey),
                fal: ApiKey::from_env(EnvKey::FalApiKey),
                replicate: ApiKey::from_env(EnvKey::ReplicateApiKey),
                heygen: ApiKey::from_env(EnvKey::HeyGenApiKey),
                skyreels: ApiKey::from_env(EnvKey::SkyReelsApiKey),
                elevenlabs: ApiKey::from_env(EnvKey::ElevenLabsApiKey),
            },
            models: ProviderModels {
                gemini: env::get_or(EnvKey::GeminiModel, &defaults.gemini),
                groq: env::get_or(EnvKey::GroqModel, &defaults.groq),
                openai: env::get_or(EnvKey::OpenAiModel, &defaults.openai),
                bytez: env::get_or(EnvKey::BytezModel, &defaults.bytez),
                fal: env::get_or(EnvKey::FalModel, &defaults.fal),
                replicate: env::get_or(EnvKey::ReplicateModel, &defaults.replicate),
                heygen_avatar_id: env::get_or(EnvKey::HeyGenAvatarId, &defaults.heygen_avatar_id),
                heygen_voice_id: env::get_or(EnvKey::HeyGenVoiceId, &defaults.heygen_voice_id),
                elevenlabs_voice_id: env::get_or(
                    EnvKey::ElevenLabsVoiceId,
                    &defaults.elevenlabs_voice_id,
                ),
            },
            youtube: OAuthClientConfig::from_env(
                EnvKey::YouTubeClientId,
                EnvKey::YouTubeClientSecret,
                EnvKey::YouTubeRedirectUri,
            ),
            instagram: OAuthClientConfig::from_env(
                EnvKey::InstagramClientId,
                EnvKey::InstagramClientSecret,
                EnvKey::InstagramRedirectUri,
            ),
        })
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests(media_root: &std::path::Path) -> Self {
        Self {
            server_port: 0,
            database_url: "postgres://localhost/shorts_test".to_string(),
            redis_url: "redis://127.0.0.1/".to_string(),
            jwt_secret: "test-secret".to_string(),
            backend_url: "http://backend.test".to_string(),
            frontend_url: "http://frontend.test".to_string(),
            renders_dir: media_root.join("renders"),
            images_dir: media_root.join("images"),
            status_poll_interval: Duration::from_secs(30),
            auto_post_interval: Duration::from_secs(60),
            keys: ProviderKeys::default(),
            models: ProviderModels::default(),
            youtube: Some(OAuthClientConfig {
                client_id: "yt-client".to_string(),
                client_secret: "yt-secret".to_string(),
                redirect_uri: "http://backend.test/api/auth/callback/youtube".to_string(),
            }),
            instagram: None,
        }
    }
}
