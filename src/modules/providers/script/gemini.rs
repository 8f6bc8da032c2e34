use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::settings::ApiKey;
use crate::modules::providers::http::send_json;
use crate::modules::providers::requests::ScriptRequest;
use crate::modules::providers::result::{settle, ProviderError};
use crate::modules::providers::{Provider, ProviderResult};

const NAME: &str = "gemini";

#[derive(Clone)]
pub struct GeminiScriptProvider {
    client: Client,
    api_key: Option<ApiKey>,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiScriptProvider {
    pub fn new(client: Client, api_key: Option<ApiKey>, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn complete(&self, key: &ApiKey, request: &ScriptRequest) -> Result<ProviderResult<String>, ProviderError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "temperature": request.temperature,
                "responseMimeType": "application/json"
            }
        });

        let response: GenerateContentResponse = send_json(
            self.client
                .post(&url)
                .query(&[("key", key.expose())])
                .json(&body),
        )
        .await?;

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::Rejected(format!(
                "empty completion (finish reason {})",
                candidate.finish_reason.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        info!("✍️ Gemini returned {} chars", text.len());
        Ok(ProviderResult::success(format!("gemini-{}", uuid::Uuid::new_v4()), text))
    }
}

#[async_trait]
impl Provider<ScriptRequest, String> for GeminiScriptProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ScriptRequest) -> ProviderResult<String> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(NAME);
        };
        settle(NAME, self.complete(key, request).await)
    }
}
