//! Content-generation providers.
//!
//! Every external service sits behind [`Provider`], grouped per service into a
//! [`FallbackDispatcher`](dispatcher::FallbackDispatcher) keyed by a closed
//! enum of provider names. The [`ProviderRegistry`](registry::ProviderRegistry)
//! owns one dispatcher per service and is built once at startup.

use async_trait::async_trait;

pub mod dispatcher;
pub mod http;
pub mod image;
pub mod registry;
pub mod requests;
pub mod result;
pub mod script;
pub mod speech;
pub mod video;

pub use result::{MediaOutput, ProviderResult, ProviderStatus};

/// One external generation API.
///
/// `generate` and `check_status` never fail past this boundary: network
/// errors, non-2xx responses and malformed payloads all come back as
/// [`ProviderResult::Error`]. An adapter without credentials must return an
/// error result without touching the network.
#[async_trait]
pub trait Provider<Req: Sync, Out: Send = MediaOutput>: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    async fn generate(&self, request: &Req) -> ProviderResult<Out>;

    async fn check_status(&self, request_id: &str) -> ProviderResult<Out> {
        ProviderResult::error(format!(
            "{} does not support status checks (request {})",
            self.name(),
            request_id
        ))
    }
}

/// Declares a closed set of provider names with string conversions.
macro_rules! provider_kind {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        pub enum $name {
            $(#[serde(rename = $key)] $variant),+
        }

        impl $name {
            #[cfg(test)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($key => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}' (expected one of: {})",
                        stringify!($name),
                        other,
                        [$($key),+].join(", ")
                    )),
                }
            }
        }
    };
}

provider_kind!(
    /// Text / script generation backends.
    ScriptProvider { Gemini => "gemini", Groq => "groq", OpenAi => "openai" }
);

provider_kind!(
    /// Still image backends.
    ImageProvider { Pexels => "pexels", Stability => "stability", OpenAi => "openai" }
);

provider_kind!(
    /// Text-to-video and avatar video backends.
    VideoProvider {
        Bytez => "bytez",
        Fal => "fal",
        Replicate => "replicate",
        HeyGen => "heygen",
        SkyReels => "skyreels",
    }
);

provider_kind!(
    /// Text-to-speech backends.
    SpeechProvider { ElevenLabs => "elevenlabs", OpenAi => "openai" }
);
