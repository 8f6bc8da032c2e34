use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

use super::error::PlatformError;

pub(crate) async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PlatformError> {
    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        let mut body = text;
        body.truncate(body.char_indices().nth(500).map(|(i, _)| i).unwrap_or(body.len()));
        return Err(PlatformError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&text).map_err(|e| PlatformError::malformed(e.to_string()))
}
