use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

use super::model::{ConnectedAccount, Platform};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub platform: Platform,
    /// Provider consent page; valid for ten minutes.
    pub auth_url: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub platform: String,
    pub platform_user_id: String,
    pub username: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub connected_at: OffsetDateTime,
}

impl From<ConnectedAccount> for AccountResponse {
    fn from(account: ConnectedAccount) -> Self {
        Self {
            platform: account.platform,
            platform_user_id: account.platform_user_id,
            username: account.platform_username,
            is_active: account.is_active,
            expires_at: account.expires_at,
            connected_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSummary {
    pub platform: Platform,
    /// Whether OAuth credentials for the platform are set on the server.
    pub configured: bool,
    pub connected: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountList {
    pub accounts: Vec<AccountResponse>,
    pub platforms: Vec<PlatformSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DisconnectResponse {
    pub platform: Platform,
}
