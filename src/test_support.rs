//! In-memory stores and scripted fakes shared by the unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::types::Json;
use tempfile::TempDir;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::common::media::MediaStorage;
use crate::config::settings::AppConfig;
use crate::modules::auth::model::User;
use crate::modules::auth::repository::{TokenBlocklist, UserStore};
use crate::modules::providers::dispatcher::FallbackDispatcher;
use crate::modules::providers::registry::ProviderRegistry;
use crate::modules::providers::{MediaOutput, Provider, ProviderResult, VideoProvider};
use crate::modules::queue::model::{NewQueueEntry, PostRecord, QueueEntry, QueueMetadata, QueueStatus};
use crate::modules::queue::repository::QueueStore;
use crate::modules::social::error::PlatformError;
use crate::modules::social::model::{
    AccountUpsert, ConnectedAccount, Platform, PublishRequest, PublishedPost,
};
use crate::modules::social::oauth_state::OAuthStateStore;
use crate::modules::social::publisher::{OAuthFlow, PlatformRegistry, SocialPublisher};
use crate::modules::social::repository::AccountStore;
use crate::modules::videos::model::{NewVideo, Video, VideoStatus};
use crate::modules::videos::repository::VideoStore;
use crate::state::{AppState, Stores};
use crate::workers::renderer::FfmpegCompositor;

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

/// Provider names in the order their `generate` was called.
#[derive(Debug, Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn record(&self, name: &'static str) {
        locked(&self.0).push(name);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        locked(&self.0).clone()
    }
}

/// A provider that answers with canned results. Clones share the call counter.
#[derive(Clone)]
pub struct ScriptedProvider<Out = MediaOutput> {
    name: &'static str,
    log: CallLog,
    available: bool,
    result: Option<ProviderResult<Out>>,
    status: Option<ProviderResult<Out>>,
    calls: Arc<AtomicUsize>,
}

impl<Out: Clone> ScriptedProvider<Out> {
    pub fn new(name: &'static str, log: CallLog) -> Self {
        Self {
            name,
            log,
            available: true,
            result: None,
            status: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn returning(mut self, result: ProviderResult<Out>) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_status(mut self, result: ProviderResult<Out>) -> Self {
        self.status = Some(result);
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<Req, Out> Provider<Req, Out> for ScriptedProvider<Out>
where
    Req: Sync,
    Out: Clone + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn generate(&self, _request: &Req) -> ProviderResult<Out> {
        if !self.available {
            return ProviderResult::unavailable(self.name);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.record(self.name);
        self.result
            .clone()
            .unwrap_or_else(|| ProviderResult::error(format!("{} has no scripted result", self.name)))
    }

    async fn check_status(&self, request_id: &str) -> ProviderResult<Out> {
        self.status
            .clone()
            .unwrap_or_else(|| ProviderResult::error(format!("{} has no scripted status for {request_id}", self.name)))
    }
}

/// A registry with no providers at all.
pub fn empty_registry() -> ProviderRegistry {
    ProviderRegistry {
        script: FallbackDispatcher::new("script"),
        image: FallbackDispatcher::new("image"),
        video: FallbackDispatcher::new("video"),
        avatar: FallbackDispatcher::new("avatar"),
        speech: FallbackDispatcher::new("speech"),
    }
}

pub fn media_storage(root: &Path) -> MediaStorage {
    MediaStorage::new(
        reqwest::Client::new(),
        root.join("renders"),
        root.join("images"),
        "http://backend.test",
    )
}

#[derive(Default)]
pub struct InMemoryVideoStore {
    rows: Mutex<Vec<Video>>,
}

impl InMemoryVideoStore {
    pub fn insert(&self, video: Video) -> Video {
        locked(&self.rows).push(video.clone());
        video
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        locked(&self.rows).iter().find(|v| v.id == id).cloned()
    }

    pub fn all(&self) -> Vec<Video> {
        locked(&self.rows).clone()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn create(&self, video: NewVideo) -> Result<Video, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        Ok(self.insert(Video {
            id: Uuid::new_v4(),
            user_id: video.user_id,
            title: video.title,
            caption: video.caption,
            duration: video.duration,
            style: video.style,
            status: video.status,
            video_url: video.video_url,
            scenes: Json(video.scenes),
            metadata: Json(video.metadata),
            created_at: now,
            updated_at: now,
        }))
    }

    async fn find(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        Ok(self.get(id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, sqlx::Error> {
        let mut rows: Vec<Video> = self.all().into_iter().filter(|v| v.user_id == user_id).collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_by_request_id(
        &self,
        provider: VideoProvider,
        request_id: &str,
    ) -> Result<Option<Video>, sqlx::Error> {
        Ok(self
            .all()
            .into_iter()
            .find(|v| v.remote().is_some_and(|r| r.provider == provider && r.request_id == request_id)))
    }

    async fn list_pollable(&self, max_attempts: u32) -> Result<Vec<Video>, sqlx::Error> {
        Ok(self
            .all()
            .into_iter()
            .filter(|v| v.status == VideoStatus::Processing)
            .filter(|v| v.remote().is_some_and(|r| r.attempts < max_attempts))
            .collect())
    }

    async fn update(&self, video: &Video) -> Result<(), sqlx::Error> {
        let mut rows = locked(&self.rows);
        if let Some(row) = rows.iter_mut().find(|v| v.id == video.id) {
            *row = video.clone();
            row.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: VideoStatus) -> Result<(), sqlx::Error> {
        if let Some(row) = locked(&self.rows).iter_mut().find(|v| v.id == id) {
            row.status = status;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryQueueStore {
    rows: Mutex<Vec<QueueEntry>>,
    posts: Mutex<Vec<PostRecord>>,
    reject_posts: AtomicBool,
}

impl InMemoryQueueStore {
    pub fn insert(&self, entry: QueueEntry) -> QueueEntry {
        locked(&self.rows).push(entry.clone());
        entry
    }

    pub fn get(&self, id: Uuid) -> Option<QueueEntry> {
        locked(&self.rows).iter().find(|e| e.id == id).cloned()
    }

    pub fn post_records(&self) -> Vec<PostRecord> {
        locked(&self.posts).clone()
    }

    /// Makes every later `record_post` fail.
    pub fn reject_post_records(&self) {
        self.reject_posts.store(true, Ordering::SeqCst);
    }

    fn all(&self) -> Vec<QueueEntry> {
        locked(&self.rows).clone()
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn create(&self, entry: NewQueueEntry) -> Result<QueueEntry, sqlx::Error> {
        let now = OffsetDateTime::now_utc();
        Ok(self.insert(QueueEntry {
            id: Uuid::new_v4(),
            video_id: entry.video_id,
            user_id: entry.user_id,
            scheduled_at: entry.scheduled_at,
            platforms: Json(entry.platforms),
            status: QueueStatus::Queued,
            metadata: Json(QueueMetadata::default()),
            created_at: now,
            updated_at: now,
        }))
    }

    async fn find(&self, id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error> {
        Ok(self.get(id))
    }

    async fn find_for_video(&self, video_id: Uuid, user_id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error> {
        Ok(self
            .all()
            .into_iter()
            .find(|e| e.video_id == video_id && e.user_id == user_id))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let mut rows: Vec<QueueEntry> = self.all().into_iter().filter(|e| e.user_id == user_id).collect();
        rows.sort_by_key(|e| e.scheduled_at);
        Ok(rows)
    }

    async fn list_due(&self, now: OffsetDateTime) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let mut rows: Vec<QueueEntry> = self
            .all()
            .into_iter()
            .filter(|e| e.status == QueueStatus::Queued && e.scheduled_at <= now)
            .collect();
        rows.sort_by_key(|e| e.scheduled_at);
        Ok(rows)
    }

    async fn update(&self, entry: &QueueEntry) -> Result<(), sqlx::Error> {
        let mut rows = locked(&self.rows);
        if let Some(row) = rows.iter_mut().find(|e| e.id == entry.id) {
            *row = entry.clone();
            row.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        locked(&self.rows).retain(|e| e.id != id);
        Ok(())
    }

    async fn record_post(&self, post: &PostRecord) -> Result<(), sqlx::Error> {
        if self.reject_posts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        locked(&self.posts).push(post.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryAccountStore {
    rows: Mutex<Vec<ConnectedAccount>>,
    upserts: AtomicUsize,
}

impl InMemoryAccountStore {
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn upsert(&self, account: AccountUpsert) -> Result<ConnectedAccount, sqlx::Error> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        let now = OffsetDateTime::now_utc();
        let mut rows = locked(&self.rows);
        let platform = account.platform.as_str();

        if let Some(row) = rows
            .iter_mut()
            .find(|a| a.user_id == account.user_id && a.platform == platform)
        {
            row.platform_user_id = account.platform_user_id;
            row.platform_username = account.platform_username;
            row.access_token = account.access_token;
            row.refresh_token = account.refresh_token.or(row.refresh_token.take());
            row.expires_at = account.expires_at;
            row.is_active = true;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = ConnectedAccount {
            id: Uuid::new_v4(),
            user_id: account.user_id,
            platform: platform.to_string(),
            platform_user_id: account.platform_user_id,
            platform_username: account.platform_username,
            access_token: account.access_token,
            refresh_token: account.refresh_token,
            expires_at: account.expires_at,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_active(&self, user_id: Uuid, platform: Platform) -> Result<Option<ConnectedAccount>, sqlx::Error> {
        Ok(locked(&self.rows)
            .iter()
            .find(|a| a.user_id == user_id && a.platform == platform.as_str() && a.is_active)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ConnectedAccount>, sqlx::Error> {
        let mut rows: Vec<ConnectedAccount> = locked(&self.rows)
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.platform.cmp(&b.platform));
        Ok(rows)
    }

    async fn update_tokens(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) -> Result<(), sqlx::Error> {
        if let Some(row) = locked(&self.rows).iter_mut().find(|a| a.id == id) {
            row.access_token = access_token.to_string();
            if let Some(refresh) = refresh_token {
                row.refresh_token = Some(refresh.to_string());
            }
            row.expires_at = expires_at;
            row.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn deactivate(&self, user_id: Uuid, platform: Platform) -> Result<bool, sqlx::Error> {
        let mut rows = locked(&self.rows);
        let Some(row) = rows
            .iter_mut()
            .find(|a| a.user_id == user_id && a.platform == platform.as_str() && a.is_active)
        else {
            return Ok(false);
        };
        row.is_active = false;
        Ok(true)
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    /// Seeds a user whose password never verifies.
    pub fn insert(&self, username: &str, email: &str) -> User {
        self.push(username, email, "")
    }

    fn push(&self, username: &str, email: &str, password_hash: &str) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        locked(&self.rows).push(user.clone());
        user
    }

    fn find_where(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        locked(&self.rows).iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        Ok(self.push(username, email, password_hash))
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        Ok(self.find_where(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.find_where(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        Ok(self.find_where(|u| u.username == username))
    }
}

#[derive(Default)]
pub struct InMemoryBlocklist {
    tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl TokenBlocklist for InMemoryBlocklist {
    async fn revoke(&self, token: &str, _ttl_seconds: u64) -> Result<(), redis::RedisError> {
        locked(&self.tokens).push(token.to_string());
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, redis::RedisError> {
        Ok(locked(&self.tokens).iter().any(|t| t == token))
    }
}

/// Single-use nonces, like the Redis store.
#[derive(Default)]
pub struct InMemoryOAuthStates {
    issued: Mutex<Vec<(String, Platform, Uuid)>>,
}

#[async_trait]
impl OAuthStateStore for InMemoryOAuthStates {
    async fn issue(&self, user_id: Uuid, platform: Platform) -> Result<String, redis::RedisError> {
        let state = Uuid::new_v4().simple().to_string();
        locked(&self.issued).push((state.clone(), platform, user_id));
        Ok(state)
    }

    async fn consume(&self, state: &str, platform: Platform) -> Result<Option<Uuid>, redis::RedisError> {
        let mut issued = locked(&self.issued);
        let Some(index) = issued.iter().position(|(s, _, _)| s == state) else {
            return Ok(None);
        };
        let (_, stored_platform, user_id) = issued.remove(index);
        Ok((stored_platform == platform).then_some(user_id))
    }
}

/// Publisher that records calls and succeeds or fails on demand.
#[derive(Clone)]
pub struct FakePublisher {
    platform: Platform,
    failure: Option<String>,
    published: Arc<AtomicUsize>,
}

impl FakePublisher {
    pub fn succeeding(platform: Platform) -> Self {
        Self {
            platform,
            failure: None,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(platform: Platform, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::succeeding(platform)
        }
    }

    pub fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocialPublisher for FakePublisher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn is_connected(&self, _user_id: Uuid) -> Result<bool, PlatformError> {
        Ok(true)
    }

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PlatformError> {
        let n = self.published.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(message) = &self.failure {
            return Err(PlatformError::Rejected(message.clone()));
        }
        Ok(PublishedPost {
            post_id: format!("{}-{}-{n}", self.platform, request.video_id.simple()),
            url: Some(format!("https://{}.test/p/{n}", self.platform)),
        })
    }
}

/// A platform whose OAuth exchange always succeeds and stores the account.
struct FakeOAuthPlatform {
    platform: Platform,
    accounts: Arc<dyn AccountStore>,
}

#[async_trait]
impl SocialPublisher for FakeOAuthPlatform {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn is_connected(&self, user_id: Uuid) -> Result<bool, PlatformError> {
        Ok(self.accounts.find_active(user_id, self.platform).await?.is_some())
    }

    async fn publish(&self, _request: &PublishRequest) -> Result<PublishedPost, PlatformError> {
        Err(PlatformError::NotConfigured(self.platform))
    }
}

#[async_trait]
impl OAuthFlow for FakeOAuthPlatform {
    fn authorization_url(&self, state: &str) -> Result<String, PlatformError> {
        Ok(format!("https://{}.test/authorize?state={state}", self.platform))
    }

    async fn connect(&self, user_id: Uuid, code: &str) -> Result<ConnectedAccount, PlatformError> {
        Ok(self
            .accounts
            .upsert(AccountUpsert {
                user_id,
                platform: self.platform,
                platform_user_id: format!("{}-{code}", self.platform),
                platform_username: Some("tester".to_string()),
                access_token: format!("token-{code}"),
                refresh_token: None,
                expires_at: None,
            })
            .await?)
    }
}

/// An [`AppState`] over in-memory stores. The database and Redis handles
/// are lazy and never dialed.
pub struct TestContext {
    pub state: AppState,
    pub videos: Arc<InMemoryVideoStore>,
    pub queue: Arc<InMemoryQueueStore>,
    pub accounts: Arc<InMemoryAccountStore>,
    pub users: Arc<InMemoryUserStore>,
    platforms: PlatformRegistry,
    _media_root: TempDir,
}

impl TestContext {
    pub fn new(providers: ProviderRegistry) -> Self {
        let media_root = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::for_tests(media_root.path());
        let media = MediaStorage::new(
            reqwest::Client::new(),
            config.renders_dir.clone(),
            config.images_dir.clone(),
            &config.backend_url,
        );

        let videos = Arc::new(InMemoryVideoStore::default());
        let queue = Arc::new(InMemoryQueueStore::default());
        let accounts = Arc::new(InMemoryAccountStore::default());
        let users = Arc::new(InMemoryUserStore::default());
        let stores = Stores {
            videos: videos.clone(),
            queue: queue.clone(),
            accounts: accounts.clone(),
            users: users.clone(),
            revoked: Arc::new(InMemoryBlocklist::default()),
            oauth_states: Arc::new(InMemoryOAuthStates::default()),
        };

        let state = AppState::new(
            config,
            media,
            providers,
            stores,
            Arc::new(FfmpegCompositor::default()),
        );

        Self {
            state,
            videos,
            queue,
            accounts,
            users,
            platforms: PlatformRegistry::new(),
            _media_root: media_root,
        }
    }

    pub fn set_publishers(&mut self, publishers: Vec<FakePublisher>) {
        for publisher in publishers {
            self.platforms = self.platforms.clone().with_publisher(Arc::new(publisher));
        }
        self.install_platforms();
    }

    pub fn use_fake_platform(&mut self, platform: Platform) {
        let fake = Arc::new(FakeOAuthPlatform {
            platform,
            accounts: self.accounts.clone(),
        });
        self.platforms = self.platforms.clone().with_platform(fake);
        self.install_platforms();
    }

    fn install_platforms(&mut self) {
        self.state = self.state.clone().with_platforms(self.platforms.clone());
    }
}
