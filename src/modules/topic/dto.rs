use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::providers::ScriptProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLength {
    #[default]
    Short,
    Medium,
    Long,
}

impl ScriptLength {
    pub fn seconds(&self) -> u32 {
        match self {
            ScriptLength::Short => 30,
            ScriptLength::Medium => 60,
            ScriptLength::Long => 90,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequestBody {
    #[validate(length(min = 2, max = 200, message = "Topic must be between 2 and 200 characters"))]
    pub topic: String,
    #[validate(length(max = 100))]
    pub niche: Option<String>,
    #[validate(length(max = 50))]
    pub tone: Option<String>,
    #[serde(default)]
    pub length: ScriptLength,
    #[validate(length(max = 30))]
    pub language: Option<String>,
    pub provider: Option<ScriptProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSections {
    pub hook: String,
    pub main_content: String,
    pub call_to_action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedScript {
    pub title: String,
    pub sections: ScriptSections,
    /// Without the leading `#`.
    pub hashtags: Vec<String>,
    /// Seconds.
    pub estimated_duration: u32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptResponse {
    pub script: GeneratedScript,
    /// Draft video holding the script as scenes.
    pub video_id: Uuid,
    /// `None` when the offline template wrote the script.
    pub provider: Option<ScriptProvider>,
}
