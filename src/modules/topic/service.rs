use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{GeneratedScript, ScriptRequestBody, ScriptResponse, ScriptSections};
use crate::common::error::{AppError, AppResult};
use crate::modules::providers::requests::ScriptRequest;
use crate::modules::providers::script::TemplateScriptProvider;
use crate::modules::providers::{Provider, ProviderResult};
use crate::modules::videos::model::{Background, JobKind, JobMetadata, NewVideo, Scene, VideoStatus};
use crate::state::AppState;

pub const MIN_HASHTAGS: usize = 5;
pub const MAX_HASHTAGS: usize = 8;
const FILLER_HASHTAGS: [&str; 5] = ["shorts", "viral", "fyp", "trending", "learnsomething"];

const SYSTEM_PROMPT: &str = "You write scripts for vertical short-form videos. \
Reply with a single JSON object and nothing else, shaped as \
{\"title\": string, \"sections\": {\"hook\": string, \"mainContent\": string, \"callToAction\": string}, \
\"hashtags\": [string], \"estimatedDuration\": integer seconds}.";

/// The model's reply before normalization; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScript {
    title: Option<String>,
    sections: Option<RawSections>,
    #[serde(default)]
    hashtags: Vec<Value>,
    estimated_duration: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSections {
    hook: Option<String>,
    main_content: Option<String>,
    call_to_action: Option<String>,
}

pub struct TopicService;

/// Removes a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

fn to_tag(text: &str) -> String {
    text.trim()
        .trim_start_matches('#')
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Dedupes (case-insensitively), strips `#`, pads up to five tags from the
/// topic and niche, then caps the list at eight.
pub fn normalize_hashtags(raw: &[String], topic: &str, niche: Option<&str>) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let push = |candidate: &str, tags: &mut Vec<String>| {
        let tag = to_tag(candidate);
        if !tag.is_empty() && !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    };

    for tag in raw {
        push(tag, &mut tags);
    }

    let topic_tag = topic.to_lowercase();
    let mut fillers: Vec<&str> = vec![topic_tag.as_str()];
    fillers.extend(niche);
    fillers.extend(FILLER_HASHTAGS);
    for filler in fillers {
        if tags.len() >= MIN_HASHTAGS {
            break;
        }
        push(filler, &mut tags);
    }

    tags.truncate(MAX_HASHTAGS);
    tags
}

fn positive_seconds(value: Option<&Value>) -> Option<u32> {
    let seconds = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('s').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (seconds >= 1.0 && seconds <= 600.0).then(|| seconds.round() as u32)
}

/// Parses a model reply into a script, filling whatever the model left out.
pub fn parse_script(reply: &str, body: &ScriptRequestBody) -> Result<GeneratedScript, serde_json::Error> {
    let raw: RawScript = serde_json::from_str(strip_code_fence(reply))?;
    let sections = raw.sections.unwrap_or_default();
    let text = |value: Option<String>, fallback: String| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(fallback)
    };

    let hashtags: Vec<String> = raw
        .hashtags
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    Ok(GeneratedScript {
        title: text(raw.title, body.topic.trim().to_string()),
        sections: ScriptSections {
            hook: text(sections.hook, format!("Did you know this about {}?", body.topic.trim())),
            main_content: text(sections.main_content, body.topic.trim().to_string()),
            call_to_action: text(sections.call_to_action, "Follow for more.".to_string()),
        },
        hashtags: normalize_hashtags(&hashtags, &body.topic, body.niche.as_deref()),
        estimated_duration: positive_seconds(raw.estimated_duration.as_ref())
            .unwrap_or_else(|| body.length.seconds()),
    })
}

fn user_prompt(body: &ScriptRequestBody) -> String {
    let mut prompt = format!(
        "Write a {}-second short video script about \"{}\".",
        body.length.seconds(),
        body.topic.trim()
    );
    if let Some(niche) = body.niche.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(" The channel niche is {}.", niche.trim()));
    }
    prompt.push_str(&format!(
        " Tone: {}. Language: {}. Include {} to {} hashtags.",
        body.tone.as_deref().unwrap_or("energetic"),
        body.language.as_deref().unwrap_or("English"),
        MIN_HASHTAGS,
        MAX_HASHTAGS
    ));
    prompt
}

/// Hook, main body and call to action, timed roughly 1:3:1.
pub fn scenes_for(script: &GeneratedScript, background: &str) -> Vec<Scene> {
    let total = script.estimated_duration.max(3);
    let edge = (total / 5).max(1);
    let middle = total.saturating_sub(edge * 2).max(1);
    let background = Background::Prompt {
        text: background.to_string(),
    };

    vec![
        Scene {
            narration: script.sections.hook.clone(),
            text_overlay: Some(script.title.clone()),
            duration: edge,
            background: background.clone(),
        },
        Scene {
            narration: script.sections.main_content.clone(),
            text_overlay: None,
            duration: middle,
            background: background.clone(),
        },
        Scene {
            narration: script.sections.call_to_action.clone(),
            text_overlay: None,
            duration: edge,
            background,
        },
    ]
}

impl TopicService {
    pub async fn generate_script(state: &AppState, user_id: Uuid, body: ScriptRequestBody) -> AppResult<ScriptResponse> {
        let request = ScriptRequest {
            system: SYSTEM_PROMPT.to_string(),
            prompt: user_prompt(&body),
            temperature: 0.8,
            topic: body.topic.trim().to_string(),
            target_seconds: body.length.seconds(),
        };

        let dispatched = state.providers.script.dispatch(body.provider, &request).await;
        let mut provider = dispatched.provider;
        let reply = match dispatched.result {
            ProviderResult::Success { output, .. } => output,
            ProviderResult::Error { error } => return Err(AppError::Provider(error)),
            ProviderResult::Processing { .. } => {
                return Err(AppError::Provider("script generation did not finish".to_string()));
            }
        };

        let script = match parse_script(&reply, &body) {
            Ok(script) => script,
            Err(e) => {
                warn!("script reply from {:?} was not valid JSON ({}), using template", provider, e);
                provider = None;
                let fallback = match TemplateScriptProvider.generate(&request).await {
                    ProviderResult::Success { output, .. } => output,
                    _ => return Err(AppError::Provider("template script failed".to_string())),
                };
                parse_script(&fallback, &body).map_err(|e| AppError::Internal(e.into()))?
            }
        };

        let background = match body.niche.as_deref() {
            Some(niche) if !niche.trim().is_empty() => format!("{} {}", body.topic.trim(), niche.trim()),
            _ => body.topic.trim().to_string(),
        };

        let video = state
            .videos
            .create(NewVideo {
                user_id,
                title: script.title.clone(),
                caption: Some(script.sections.hook.clone()),
                duration: script.estimated_duration as i32,
                style: body.tone.clone(),
                status: VideoStatus::Draft,
                video_url: None,
                scenes: scenes_for(&script, &background),
                metadata: JobMetadata::new(JobKind::Script {
                    topic: body.topic.trim().to_string(),
                    niche: body.niche.clone(),
                    tone: body.tone.clone(),
                    language: body.language.clone(),
                    hashtags: script.hashtags.clone(),
                }),
            })
            .await?;

        info!("✍️ Script '{}' saved as draft video {}", script.title, video.id);
        Ok(ScriptResponse {
            script,
            video_id: video.id,
            provider,
        })
    }
}
