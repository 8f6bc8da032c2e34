use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use super::error::PlatformError;
use super::http::send_json;
use super::model::{AccountUpsert, ConnectedAccount, Platform, PublishRequest, PublishedPost};
use super::publisher::{OAuthFlow, SocialPublisher};
use super::repository::AccountStore;
use crate::config::settings::OAuthClientConfig;

const GRAPH_VERSION: &str = "v19.0";
const SCOPES: &str = "instagram_basic,instagram_content_publish,pages_show_list,pages_read_engagement";
/// Long-lived tokens are exchanged again once they are this close to expiry.
const REFRESH_WINDOW: time::Duration = time::Duration::days(7);
const LONG_LIVED_DEFAULT_SECS: i64 = 60 * 24 * 60 * 60;
const CAPTION_LIMIT: usize = 2200;

pub struct InstagramPublisher {
    client: Client,
    oauth: OAuthClientConfig,
    accounts: Arc<dyn AccountStore>,
    dialog_url: String,
    graph_url: String,
    container_poll: Duration,
    container_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Pages {
    #[serde(default)]
    data: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    instagram_business_account: Option<BusinessAccount>,
}

#[derive(Debug, Deserialize)]
struct BusinessAccount {
    id: String,
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerStatus {
    status_code: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Permalink {
    permalink: Option<String>,
}

/// Description followed by `#tag` tokens, within Instagram's caption limit.
pub fn build_caption(description: &str, hashtags: &[String]) -> String {
    let tags: Vec<String> = hashtags
        .iter()
        .map(|t| t.trim().trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .map(|t| format!("#{t}"))
        .collect();

    let caption = match (description.trim(), tags.is_empty()) {
        ("", _) => tags.join(" "),
        (text, true) => text.to_string(),
        (text, false) => format!("{text}\n\n{}", tags.join(" ")),
    };
    caption.chars().take(CAPTION_LIMIT).collect()
}

impl InstagramPublisher {
    pub fn new(client: Client, oauth: OAuthClientConfig, accounts: Arc<dyn AccountStore>) -> Self {
        Self {
            client,
            oauth,
            accounts,
            dialog_url: format!("https://www.facebook.com/{GRAPH_VERSION}/dialog/oauth"),
            graph_url: format!("https://graph.facebook.com/{GRAPH_VERSION}"),
            container_poll: Duration::from_secs(5),
            container_attempts: 60,
        }
    }

    pub fn with_graph_url(mut self, graph_url: &str) -> Self {
        self.graph_url = graph_url.trim_end_matches('/').to_string();
        self
    }

    /// How often and how many times to check a media container before publishing.
    pub fn with_container_poll(mut self, every: Duration, attempts: u32) -> Self {
        self.container_poll = every;
        self.container_attempts = attempts.max(1);
        self
    }

    async fn exchange_long_lived(&self, token: &str) -> Result<TokenResponse, PlatformError> {
        send_json(self.client.get(format!("{}/oauth/access_token", self.graph_url)).query(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("fb_exchange_token", token),
        ]))
        .await
    }

    /// Instagram has no refresh token; a long-lived token near expiry is
    /// exchanged for a new one.
    async fn access_token(&self, account: &ConnectedAccount) -> Result<String, PlatformError> {
        let now = OffsetDateTime::now_utc();
        if !account.expires_within(REFRESH_WINDOW, now) {
            return Ok(account.access_token.clone());
        }
        if account.expires_at.is_some_and(|at| at <= now) {
            return Err(PlatformError::Reauthorize(Platform::Instagram));
        }

        info!("🔑 Extending Instagram token for user {}", account.user_id);
        let token = self.exchange_long_lived(&account.access_token).await?;
        let expires_at = now + time::Duration::seconds(token.expires_in.unwrap_or(LONG_LIVED_DEFAULT_SECS));
        self.accounts
            .update_tokens(account.id, &token.access_token, None, Some(expires_at))
            .await?;
        Ok(token.access_token)
    }

    async fn wait_until_finished(&self, container_id: &str, token: &str) -> Result<(), PlatformError> {
        for attempt in 1..=self.container_attempts {
            let status: ContainerStatus = send_json(
                self.client
                    .get(format!("{}/{}", self.graph_url, container_id))
                    .query(&[("fields", "status_code,status"), ("access_token", token)]),
            )
            .await?;

            match status.status_code.as_deref().unwrap_or("IN_PROGRESS") {
                "FINISHED" => return Ok(()),
                "ERROR" | "EXPIRED" => {
                    return Err(PlatformError::Rejected(format!(
                        "Instagram could not process the video: {}",
                        status.status.unwrap_or_else(|| "unknown error".to_string())
                    )));
                }
                other => {
                    if attempt < self.container_attempts {
                        tracing::debug!("instagram container {} is {} ({}/{})", container_id, other, attempt, self.container_attempts);
                        tokio::time::sleep(self.container_poll).await;
                    }
                }
            }
        }

        Err(PlatformError::Rejected(format!(
            "Instagram container {container_id} was not ready after {} checks",
            self.container_attempts
        )))
    }
}

#[async_trait]
impl SocialPublisher for InstagramPublisher {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn is_connected(&self, user_id: Uuid) -> Result<bool, PlatformError> {
        Ok(self.accounts.find_active(user_id, Platform::Instagram).await?.is_some())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PlatformError> {
        let account = self
            .accounts
            .find_active(request.user_id, Platform::Instagram)
            .await?
            .ok_or(PlatformError::NotConnected(Platform::Instagram))?;

        if !request.public_url.starts_with("https://") && !request.public_url.starts_with("http://") {
            return Err(PlatformError::Rejected(
                "Instagram needs a publicly reachable video URL".to_string(),
            ));
        }

        let token = self.access_token(&account).await?;
        let ig_user = &account.platform_user_id;
        let caption = build_caption(&request.description, &request.hashtags);

        let container: Created = send_json(
            self.client
                .post(format!("{}/{}/media", self.graph_url, ig_user))
                .form(&[
                    ("media_type", "REELS"),
                    ("video_url", request.public_url.as_str()),
                    ("caption", caption.as_str()),
                    ("share_to_feed", "true"),
                    ("access_token", token.as_str()),
                ]),
        )
        .await?;
        info!("📦 Instagram container {} created for video {}", container.id, request.video_id);

        self.wait_until_finished(&container.id, &token).await?;

        let published: Created = send_json(
            self.client
                .post(format!("{}/{}/media_publish", self.graph_url, ig_user))
                .form(&[("creation_id", container.id.as_str()), ("access_token", token.as_str())]),
        )
        .await?;

        let url = match send_json::<Permalink>(
            self.client
                .get(format!("{}/{}", self.graph_url, published.id))
                .query(&[("fields", "permalink"), ("access_token", token.as_str())]),
        )
        .await
        {
            Ok(link) => link.permalink,
            Err(e) => {
                warn!("no permalink for instagram media {}: {}", published.id, e);
                None
            }
        };

        Ok(PublishedPost {
            post_id: published.id,
            url,
        })
    }
}

#[async_trait]
impl OAuthFlow for InstagramPublisher {
    fn authorization_url(&self, state: &str) -> Result<String, PlatformError> {
        let url = Url::parse_with_params(
            &self.dialog_url,
            &[
                ("client_id", self.oauth.client_id.as_str()),
                ("redirect_uri", self.oauth.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("state", state),
            ],
        )
        .map_err(|e| PlatformError::Other(e.into()))?;
        Ok(url.into())
    }

    async fn connect(&self, user_id: Uuid, code: &str) -> Result<ConnectedAccount, PlatformError> {
        let short: TokenResponse = send_json(self.client.get(format!("{}/oauth/access_token", self.graph_url)).query(&[
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ("code", code),
        ]))
        .await?;
        let long = self.exchange_long_lived(&short.access_token).await?;

        let pages: Pages = send_json(
            self.client
                .get(format!("{}/me/accounts", self.graph_url))
                .query(&[
                    ("fields", "instagram_business_account{id,username}"),
                    ("access_token", long.access_token.as_str()),
                ]),
        )
        .await?;
        let business = pages
            .data
            .into_iter()
            .find_map(|p| p.instagram_business_account)
            .ok_or_else(|| {
                PlatformError::Rejected("no Instagram business account is linked to these pages".to_string())
            })?;

        let expires_at = OffsetDateTime::now_utc()
            + time::Duration::seconds(long.expires_in.unwrap_or(LONG_LIVED_DEFAULT_SECS));
        let account = self
            .accounts
            .upsert(AccountUpsert {
                user_id,
                platform: Platform::Instagram,
                platform_user_id: business.id,
                platform_username: business.username,
                access_token: long.access_token,
                refresh_token: None,
                expires_at: Some(expires_at),
            })
            .await?;

        info!("🔗 Instagram account {} linked for user {}", account.platform_user_id, user_id);
        Ok(account)
    }
}
