use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::dto::{AccountList, AccountResponse, CallbackQuery, ConnectResponse, PlatformSummary};
use super::model::Platform;
use crate::common::error::{AppError, AppResult};
use crate::state::AppState;

pub struct SocialService;

impl SocialService {
    pub async fn connect_url(state: &AppState, user_id: Uuid, platform: Platform) -> AppResult<ConnectResponse> {
        let flow = state
            .platforms
            .oauth(platform)
            .ok_or_else(|| AppError::bad_request(format!("{platform} is not configured on this server")))?;

        let nonce = state.oauth_states.issue(user_id, platform).await?;
        let auth_url = flow
            .authorization_url(&nonce)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("building {platform} consent url: {e}")))?;

        Ok(ConnectResponse { platform, auth_url })
    }

    /// Finishes an OAuth flow and returns the frontend URL to redirect to.
    ///
    /// The user comes only from the one-time `state` nonce; without a valid
    /// one nothing is stored.
    pub async fn complete_oauth(state: &AppState, platform: Platform, query: CallbackQuery) -> AppResult<String> {
        let nonce = query
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::unauthorized("OAuth session is missing"))?;
        let user_id = state
            .oauth_states
            .consume(nonce, platform)
            .await?
            .ok_or_else(|| AppError::unauthorized("OAuth session expired or unknown"))?;

        if let Some(error) = query.error {
            let reason = query.error_description.unwrap_or(error);
            warn!("{} authorization declined for user {}: {}", platform, user_id, reason);
            return Self::settings_redirect(state, platform, Err(&reason));
        }

        let code = query
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::bad_request("authorization code is missing"))?;
        let flow = state
            .platforms
            .oauth(platform)
            .ok_or_else(|| AppError::bad_request(format!("{platform} is not configured on this server")))?;

        match flow.connect(user_id, &code).await {
            Ok(account) => {
                info!("✅ {} connected for user {} as {}", platform, user_id, account.platform_user_id);
                Self::settings_redirect(state, platform, Ok(()))
            }
            Err(e) => {
                warn!("{} connect failed for user {}: {}", platform, user_id, e);
                Self::settings_redirect(state, platform, Err(&e.to_string()))
            }
        }
    }

    fn settings_redirect(state: &AppState, platform: Platform, outcome: Result<(), &str>) -> AppResult<String> {
        let mut params = vec![("platform", platform.as_str().to_string())];
        match outcome {
            Ok(()) => params.push(("connected", "true".to_string())),
            Err(reason) => {
                params.push(("connected", "false".to_string()));
                params.push(("error", reason.to_string()));
            }
        }

        let url = Url::parse_with_params(&format!("{}/settings", state.config.frontend_url), &params)
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(url.into())
    }

    pub async fn list_accounts(state: &AppState, user_id: Uuid) -> AppResult<AccountList> {
        let accounts = state.accounts.list_for_user(user_id).await?;

        let mut platforms = Vec::with_capacity(Platform::ALL.len());
        for &platform in Platform::ALL {
            let summary = match state.platforms.publisher(platform) {
                Some(publisher) => PlatformSummary {
                    platform,
                    configured: true,
                    connected: publisher.is_connected(user_id).await.map_err(|e| {
                        AppError::Internal(anyhow::anyhow!("checking {platform} connection: {e}"))
                    })?,
                },
                // Without credentials the server cannot post, whatever rows exist.
                None => PlatformSummary {
                    platform,
                    configured: false,
                    connected: false,
                },
            };
            platforms.push(summary);
        }

        Ok(AccountList {
            accounts: accounts.into_iter().map(AccountResponse::from).collect(),
            platforms,
        })
    }

    pub async fn disconnect(state: &AppState, user_id: Uuid, platform: Platform) -> AppResult<()> {
        if !state.accounts.deactivate(user_id, platform).await? {
            return Err(AppError::not_found(format!("no connected {platform} account")));
        }
        info!("🔌 {} disconnected for user {}", platform, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::social::model::AccountUpsert;
    use crate::modules::social::repository::AccountStore;
    use crate::test_support::{empty_registry, TestContext};

    fn linked(user_id: Uuid, platform: Platform) -> AccountUpsert {
        AccountUpsert {
            user_id,
            platform,
            platform_user_id: "acct-1".into(),
            platform_username: Some("maker".into()),
            access_token: "token".into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    fn summary(list: &AccountList, platform: Platform) -> &PlatformSummary {
        list.platforms.iter().find(|p| p.platform == platform).expect("summary")
    }

    #[tokio::test]
    async fn account_list_asks_each_configured_platform() {
        let mut ctx = TestContext::new(empty_registry());
        ctx.use_fake_platform(Platform::YouTube);
        let user = Uuid::new_v4();
        ctx.accounts.upsert(linked(user, Platform::YouTube)).await.expect("youtube");
        ctx.accounts.upsert(linked(user, Platform::Instagram)).await.expect("instagram");

        let list = SocialService::list_accounts(&ctx.state, user).await.expect("list");

        assert_eq!(list.accounts.len(), 2);
        let youtube = summary(&list, Platform::YouTube);
        assert!(youtube.configured && youtube.connected);
        // Instagram has a row but no credentials on this server.
        let instagram = summary(&list, Platform::Instagram);
        assert!(!instagram.configured && !instagram.connected);

        SocialService::disconnect(&ctx.state, user, Platform::YouTube).await.expect("disconnect");
        let list = SocialService::list_accounts(&ctx.state, user).await.expect("list");
        assert!(!summary(&list, Platform::YouTube).connected);
    }
}
