use thiserror::Error;

use super::model::Platform;

/// Failure of a social platform call. Unlike generation providers, platform
/// adapters return these to the caller, which records them per platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("{0} account is not connected")]
    NotConnected(Platform),

    #[error("{0} is not configured on this server")]
    NotConfigured(Platform),

    #[error("{0} session expired, reconnect the account")]
    Reauthorize(Platform),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Rejected(String),

    #[error("account store: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PlatformError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        PlatformError::Malformed(msg.into())
    }
}
