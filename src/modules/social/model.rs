use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Instagram,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[Platform::YouTube, Platform::Instagram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Instagram => "instagram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::YouTube),
            "instagram" => Ok(Platform::Instagram),
            other => Err(format!("unsupported platform '{other}' (expected youtube or instagram)")),
        }
    }
}

/// A row of `connected_accounts`.
#[derive(Debug, Clone, FromRow)]
pub struct ConnectedAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub platform: String,
    pub platform_user_id: String,
    pub platform_username: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ConnectedAccount {
    /// True when the token expires within `window` (or has already expired).
    pub fn expires_within(&self, window: time::Duration, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at - now <= window)
    }
}

#[derive(Debug, Clone)]
pub struct AccountUpsert {
    pub user_id: Uuid,
    pub platform: Platform,
    pub platform_user_id: String,
    pub platform_username: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<OffsetDateTime>,
}

/// What a platform needs to publish one video.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub title: String,
    pub description: String,
    /// Without the leading `#`.
    pub hashtags: Vec<String>,
    /// The stored `video_url`: a `/renders/...` path or a remote URL.
    pub location: String,
    /// Absolute URL other services can fetch.
    pub public_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPost {
    pub post_id: String,
    pub url: Option<String>,
}
