use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Outcome of one provider call, in the shared three-state vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProviderResult<T> {
    #[serde(rename_all = "camelCase")]
    Success { request_id: String, output: T },
    #[serde(rename_all = "camelCase")]
    Processing { request_id: String },
    Error { error: String },
}

impl<T> ProviderResult<T> {
    pub fn success(request_id: impl Into<String>, output: T) -> Self {
        ProviderResult::Success {
            request_id: request_id.into(),
            output,
        }
    }

    pub fn processing(request_id: impl Into<String>) -> Self {
        ProviderResult::Processing {
            request_id: request_id.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ProviderResult::Error {
            error: error.into(),
        }
    }

    pub fn unavailable(provider: &str) -> Self {
        Self::error(format!("{provider} is not configured"))
    }

    #[cfg(test)]
    pub fn is_error(&self) -> bool {
        matches!(self, ProviderResult::Error { .. })
    }

    /// Empty for errors.
    #[cfg(test)]
    pub fn request_id(&self) -> &str {
        match self {
            ProviderResult::Success { request_id, .. } | ProviderResult::Processing { request_id } => {
                request_id
            }
            ProviderResult::Error { .. } => "",
        }
    }

    pub fn status(&self) -> ProviderStatus {
        match self {
            ProviderResult::Success { .. } => ProviderStatus::Success,
            ProviderResult::Processing { .. } => ProviderStatus::Processing,
            ProviderResult::Error { .. } => ProviderStatus::Error,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProviderResult::Error { error } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Success,
    Processing,
    Error,
}

/// A generated media file: where the provider put it, and where we keep a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaOutput {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl MediaOutput {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            local_path: None,
            file: None,
        }
    }

    pub fn stored(url: impl Into<String>, stored: crate::common::media::StoredMedia) -> Self {
        Self {
            url: url.into(),
            local_path: Some(stored.public_path),
            file: Some(stored.path),
        }
    }

    /// The location the rest of the system should reference: the local copy
    /// when one was downloaded, otherwise the provider URL.
    pub fn preferred_location(&self) -> &str {
        self.local_path.as_deref().unwrap_or(&self.url)
    }
}

/// Maps provider-specific job states onto [`ProviderStatus`].
pub fn normalize_status(raw: &str) -> ProviderStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "succeeded" | "success" | "successful" | "complete" | "completed" | "finished" | "done" => {
            ProviderStatus::Success
        }
        "failed" | "failure" | "fail" | "error" | "errored" | "canceled" | "cancelled" | "expired"
        | "timeout" | "timed_out" | "rejected" => ProviderStatus::Error,
        _ => ProviderStatus::Processing,
    }
}

/// Internal adapter error; converted to [`ProviderResult::Error`] at the adapter boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Malformed(String),

    #[error("provider reported failure: {0}")]
    Rejected(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        ProviderError::Malformed(msg.into())
    }
}

impl<T> From<ProviderError> for ProviderResult<T> {
    fn from(err: ProviderError) -> Self {
        ProviderResult::error(err.to_string())
    }
}

/// Collapses an adapter's internal `Result` into the boundary result type.
pub fn settle<T>(provider: &str, result: Result<ProviderResult<T>, ProviderError>) -> ProviderResult<T> {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!("{} call failed: {}", provider, e);
            ProviderResult::error(format!("{provider}: {e}"))
        }
    }
}
