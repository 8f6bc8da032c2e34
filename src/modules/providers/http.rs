use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use tracing::warn;

use super::result::{MediaOutput, ProviderError};
use crate::common::media::{extension_from_url, MediaKind, MediaStorage};

/// Sends a request and fails on any non-2xx status, keeping the body for diagnostics.
pub async fn send(request: RequestBuilder) -> Result<Response, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: truncate(&body, 500),
    })
}

pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = send(request).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ProviderError::malformed(format!("{e}: {}", truncate(&text, 200))))
}

pub async fn send_bytes(request: RequestBuilder) -> Result<bytes::Bytes, ProviderError> {
    let response = send(request).await?;
    let body = response.bytes().await?;
    if body.is_empty() {
        return Err(ProviderError::malformed("empty body"));
    }
    Ok(body)
}

/// Keeps a local copy of a finished remote file. A failed download keeps the
/// remote URL so the result is still usable.
pub async fn mirror(media: &MediaStorage, url: &str, kind: MediaKind, fallback_ext: &str) -> MediaOutput {
    let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension_from_url(url, fallback_ext));
    match media.download(url, kind, &file_name).await {
        Ok(stored) => MediaOutput::stored(url, stored),
        Err(e) => {
            warn!("keeping remote copy of {}: {:#}", url, e);
            MediaOutput::remote(url)
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
