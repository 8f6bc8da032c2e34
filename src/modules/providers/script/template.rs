use async_trait::async_trait;
use serde_json::json;

use crate::modules::providers::requests::ScriptRequest;
use crate::modules::providers::{Provider, ProviderResult};

/// Offline script writer used when no language model is reachable.
///
/// The output is derived only from the topic, so the same request always
/// yields the same script.
#[derive(Clone, Default)]
pub struct TemplateScriptProvider;

impl TemplateScriptProvider {
    fn render(request: &ScriptRequest) -> serde_json::Value {
        let topic = request.topic.trim();
        let topic = if topic.is_empty() { "this topic" } else { topic };
        let tag = topic
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        json!({
            "title": format!("{} in {} seconds", capitalize(topic), request.target_seconds),
            "sections": {
                "hook": format!("Here is something about {topic} you probably did not know."),
                "mainContent": format!(
                    "Let's break down {topic}: what it is, why people care about it, and one thing you can try today."
                ),
                "callToAction": "Follow for more quick explainers like this one."
            },
            "hashtags": [tag, "shorts", "learnontiktok", "didyouknow", "explained"],
            "estimatedDuration": request.target_seconds
        })
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl Provider<ScriptRequest, String> for TemplateScriptProvider {
    fn name(&self) -> &'static str {
        "template"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &ScriptRequest) -> ProviderResult<String> {
        let script = Self::render(request);
        ProviderResult::success(format!("template-{}", request.topic.len()), script.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn template_is_deterministic_json() {
        let request = ScriptRequest {
            system: String::new(),
            prompt: String::new(),
            temperature: 0.0,
            topic: "sourdough bread".to_string(),
            target_seconds: 60,
        };

        let first = TemplateScriptProvider.generate(&request).await;
        let second = TemplateScriptProvider.generate(&request).await;
        assert_eq!(first, second);

        let ProviderResult::Success { output, .. } = first else {
            panic!("template must succeed");
        };
        let value: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(value["title"], "Sourdough bread in 60 seconds");
        assert_eq!(value["hashtags"][0], "sourdoughbread");
        assert_eq!(value["estimatedDuration"], 60);
    }
}
