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

/// Chat-completions client for OpenAI and OpenAI-compatible hosts (Groq).
#[derive(Clone)]
pub struct ChatCompletionsProvider {
    name: &'static str,
    client: Client,
    api_key: Option<ApiKey>,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    id: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl ChatCompletionsProvider {
    pub fn openai(client: Client, api_key: Option<ApiKey>, model: String) -> Self {
        Self {
            name: "openai",
            client,
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn groq(client: Client, api_key: Option<ApiKey>, model: String) -> Self {
        Self {
            name: "groq",
            client,
            api_key,
            model,
            base_url: "https://api.groq.com/openai/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn complete(&self, key: &ApiKey, request: &ScriptRequest) -> Result<ProviderResult<String>, ProviderError> {
        let body = json!({
            "model": self.model,
            "temperature": request.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt }
            ]
        });

        let response: ChatResponse = send_json(
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(key.expose())
                .json(&body),
        )
        .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::malformed("completion has no content"))?;

        info!("✍️ {} returned {} chars", self.name, content.len());
        let request_id = response
            .id
            .unwrap_or_else(|| format!("{}-{}", self.name, uuid::Uuid::new_v4()));
        Ok(ProviderResult::success(request_id, content))
    }
}

#[async_trait]
impl Provider<ScriptRequest, String> for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ScriptRequest) -> ProviderResult<String> {
        let Some(key) = &self.api_key else {
            return ProviderResult::unavailable(self.name);
        };
        settle(self.name, self.complete(key, request).await)
    }
}
