use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use tracing::info;
use url::Url;
use uuid::Uuid;

use super::error::PlatformError;
use super::http::send_json;
use super::model::{AccountUpsert, ConnectedAccount, Platform, PublishRequest, PublishedPost};
use super::publisher::{OAuthFlow, SocialPublisher};
use super::repository::AccountStore;
use crate::common::media::MediaStorage;
use crate::config::settings::OAuthClientConfig;

const SCOPES: &str = "https://www.googleapis.com/auth/youtube.upload https://www.googleapis.com/auth/youtube.readonly";
/// Tokens this close to expiry are refreshed before use.
const REFRESH_BUFFER: time::Duration = time::Duration::minutes(5);
pub const PRIVACY_STATUS: &str = "public";
const MAX_TITLE_CHARS: usize = 100;

pub struct YouTubePublisher {
    client: Client,
    oauth: OAuthClientConfig,
    accounts: Arc<dyn AccountStore>,
    media: MediaStorage,
    auth_url: String,
    token_url: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    items: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    snippet: Option<ChannelSnippet>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

fn expiry(expires_in: Option<i64>) -> Option<OffsetDateTime> {
    expires_in.map(|secs| OffsetDateTime::now_utc() + time::Duration::seconds(secs))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

impl YouTubePublisher {
    pub fn new(client: Client, oauth: OAuthClientConfig, accounts: Arc<dyn AccountStore>, media: MediaStorage) -> Self {
        Self {
            client,
            oauth,
            accounts,
            media,
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
        }
    }

    /// Points token and API calls at another host.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.token_url = format!("{base}/token");
        self.api_base = base.to_string();
        self
    }

    /// A usable access token, refreshed and persisted when it is about to expire.
    async fn access_token(&self, account: &ConnectedAccount) -> Result<String, PlatformError> {
        if !account.expires_within(REFRESH_BUFFER, OffsetDateTime::now_utc()) {
            return Ok(account.access_token.clone());
        }

        let refresh_token = account
            .refresh_token
            .as_deref()
            .ok_or(PlatformError::Reauthorize(Platform::YouTube))?;

        info!("🔑 Refreshing YouTube token for user {}", account.user_id);
        let token: TokenResponse = send_json(self.client.post(&self.token_url).form(&[
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]))
        .await?;

        self.accounts
            .update_tokens(
                account.id,
                &token.access_token,
                token.refresh_token.as_deref(),
                expiry(token.expires_in),
            )
            .await?;
        Ok(token.access_token)
    }

    fn multipart_related(metadata: &serde_json::Value, video: &[u8], boundary: &str) -> Vec<u8> {
        let mut body = Vec::with_capacity(video.len() + 1024);
        body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: video/mp4\r\n\r\n").as_bytes());
        body.extend_from_slice(video);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }
}

#[async_trait]
impl SocialPublisher for YouTubePublisher {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn is_connected(&self, user_id: Uuid) -> Result<bool, PlatformError> {
        Ok(self.accounts.find_active(user_id, Platform::YouTube).await?.is_some())
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PlatformError> {
        let account = self
            .accounts
            .find_active(request.user_id, Platform::YouTube)
            .await?
            .ok_or(PlatformError::NotConnected(Platform::YouTube))?;
        let token = self.access_token(&account).await?;
        let video = self.media.read(&request.location).await?;

        let mut description = request.description.clone();
        if !request.hashtags.is_empty() {
            let tags: Vec<String> = request.hashtags.iter().map(|t| format!("#{t}")).collect();
            description = format!("{description}\n\n{}", tags.join(" "));
        }
        let metadata = json!({
            "snippet": {
                "title": truncate_chars(&request.title, MAX_TITLE_CHARS),
                "description": description.trim(),
                "tags": request.hashtags,
                "categoryId": "22"
            },
            "status": { "privacyStatus": PRIVACY_STATUS, "selfDeclaredMadeForKids": false }
        });

        let boundary = format!("shorts{}", Uuid::new_v4().simple());
        let body = Self::multipart_related(&metadata, &video, &boundary);

        info!("📤 Uploading video {} to YouTube ({} bytes)", request.video_id, video.len());
        let uploaded: UploadedVideo = send_json(
            self.client
                .post(format!("{}/upload/youtube/v3/videos", self.api_base))
                .query(&[("uploadType", "multipart"), ("part", "snippet,status")])
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
                .body(body),
        )
        .await?;

        Ok(PublishedPost {
            url: Some(format!("https://www.youtube.com/shorts/{}", uploaded.id)),
            post_id: uploaded.id,
        })
    }
}

#[async_trait]
impl OAuthFlow for YouTubePublisher {
    fn authorization_url(&self, state: &str) -> Result<String, PlatformError> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.oauth.client_id.as_str()),
                ("redirect_uri", self.oauth.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", SCOPES),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| PlatformError::Other(e.into()))?;
        Ok(url.into())
    }

    async fn connect(&self, user_id: Uuid, code: &str) -> Result<ConnectedAccount, PlatformError> {
        let token: TokenResponse = send_json(self.client.post(&self.token_url).form(&[
            ("code", code),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("redirect_uri", self.oauth.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ]))
        .await?;

        let channels: ChannelList = send_json(
            self.client
                .get(format!("{}/youtube/v3/channels", self.api_base))
                .query(&[("part", "snippet"), ("mine", "true")])
                .bearer_auth(&token.access_token),
        )
        .await?;
        let channel = channels
            .items
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::Rejected("this Google account has no YouTube channel".to_string()))?;

        let account = self
            .accounts
            .upsert(AccountUpsert {
                user_id,
                platform: Platform::YouTube,
                platform_user_id: channel.id,
                platform_username: channel.snippet.and_then(|s| s.title),
                access_token: token.access_token,
                refresh_token: token.refresh_token,
                expires_at: expiry(token.expires_in),
            })
            .await?;

        info!("🔗 YouTube channel {} linked for user {}", account.platform_user_id, user_id);
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{media_storage, InMemoryAccountStore};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn oauth() -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "yt-id".into(),
            client_secret: "yt-secret".into(),
            redirect_uri: "http://backend.test/api/auth/callback/youtube".into(),
        }
    }

    fn account(user_id: Uuid, expires_at: Option<OffsetDateTime>) -> AccountUpsert {
        AccountUpsert {
            user_id,
            platform: Platform::YouTube,
            platform_user_id: "UC1".into(),
            platform_username: Some("Channel".into()),
            access_token: "old-token".into(),
            refresh_token: Some("refresh-1".into()),
            expires_at,
        }
    }

    #[test]
    fn authorization_url_carries_state_and_offline_access() {
        let root = tempfile::tempdir().expect("tempdir");
        let youtube = YouTubePublisher::new(
            Client::new(),
            oauth(),
            Arc::new(InMemoryAccountStore::default()),
            media_storage(root.path()),
        );

        let url = youtube.authorization_url("nonce123").expect("url");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("client_id=yt-id"));
    }

    #[tokio::test]
    async fn expiring_token_is_refreshed_before_upload() {
        let server = MockServer::start().await;
        let root = tempfile::tempdir().expect("tempdir");
        let media = media_storage(root.path());
        media
            .write_bytes(crate::common::media::MediaKind::Video, "v.mp4", b"fake-mp4")
            .await
            .expect("write");

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/youtube/v3/videos"))
            .and(query_param("uploadType", "multipart"))
            .and(header("authorization", "Bearer fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "yt-abc" })))
            .expect(1)
            .mount(&server)
            .await;

        let accounts = Arc::new(InMemoryAccountStore::default());
        let user = Uuid::new_v4();
        accounts
            .upsert(account(user, Some(OffsetDateTime::now_utc() + time::Duration::minutes(2))))
            .await
            .expect("seed");

        let youtube = YouTubePublisher::new(Client::new(), oauth(), accounts.clone(), media).with_base_url(&server.uri());
        let post = youtube
            .publish(&PublishRequest {
                user_id: user,
                video_id: Uuid::new_v4(),
                title: "Cats".into(),
                description: "Why cats knead".into(),
                hashtags: vec!["cats".into()],
                location: "/renders/v.mp4".into(),
                public_url: "http://backend.test/renders/v.mp4".into(),
            })
            .await
            .expect("publish");

        assert_eq!(post.post_id, "yt-abc");
        assert_eq!(post.url.as_deref(), Some("https://www.youtube.com/shorts/yt-abc"));
        let stored = accounts
            .find_active(user, Platform::YouTube)
            .await
            .expect("find")
            .expect("account");
        assert_eq!(stored.access_token, "fresh-token");
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[tokio::test]
    async fn publishing_without_an_account_is_not_connected() {
        let root = tempfile::tempdir().expect("tempdir");
        let youtube = YouTubePublisher::new(
            Client::new(),
            oauth(),
            Arc::new(InMemoryAccountStore::default()),
            media_storage(root.path()),
        );

        let err = youtube
            .publish(&PublishRequest {
                user_id: Uuid::new_v4(),
                video_id: Uuid::new_v4(),
                title: "t".into(),
                description: String::new(),
                hashtags: Vec::new(),
                location: "/renders/missing.mp4".into(),
                public_url: String::new(),
            })
            .await
            .expect_err("no account");
        assert!(matches!(err, PlatformError::NotConnected(Platform::YouTube)));
    }

    #[tokio::test]
    async fn connection_follows_the_active_account_row() {
        let root = tempfile::tempdir().expect("tempdir");
        let accounts = Arc::new(InMemoryAccountStore::default());
        let youtube = YouTubePublisher::new(Client::new(), oauth(), accounts.clone(), media_storage(root.path()));
        let user = Uuid::new_v4();

        assert!(!youtube.is_connected(user).await.expect("missing"));

        accounts.upsert(account(user, None)).await.expect("seed");
        assert!(youtube.is_connected(user).await.expect("active"));

        accounts.deactivate(user, Platform::YouTube).await.expect("deactivate");
        assert!(!youtube.is_connected(user).await.expect("deactivated"));
    }
}
