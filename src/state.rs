use std::sync::Arc;

use crate::common::media::MediaStorage;
use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::DbPool;
use crate::infrastructure::redis::client::RedisService;
use crate::modules::auth::repository::{PgUserRepository, RedisTokenBlocklist, TokenBlocklist, UserStore};
use crate::modules::providers::registry::ProviderRegistry;
use crate::modules::queue::publisher::QueuePublisher;
use crate::modules::queue::repository::{PgQueueRepository, QueueStore};
use crate::modules::social::oauth_state::{OAuthStateStore, RedisOAuthStates};
use crate::modules::social::publisher::PlatformRegistry;
use crate::modules::social::repository::{AccountStore, PgAccountRepository};
use crate::modules::videos::repository::{PgVideoRepository, VideoStore};
use crate::workers::renderer::{Compositor, RenderPipeline};

/// Persistence behind the services.
#[derive(Clone)]
pub struct Stores {
    pub videos: Arc<dyn VideoStore>,
    pub queue: Arc<dyn QueueStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub users: Arc<dyn UserStore>,
    pub revoked: Arc<dyn TokenBlocklist>,
    pub oauth_states: Arc<dyn OAuthStateStore>,
}

impl Stores {
    pub fn postgres(db: &DbPool, redis: &RedisService) -> Self {
        Self {
            videos: Arc::new(PgVideoRepository::new(db.clone())),
            queue: Arc::new(PgQueueRepository::new(db.clone())),
            accounts: Arc::new(PgAccountRepository::new(db.clone())),
            users: Arc::new(PgUserRepository::new(db.clone())),
            revoked: Arc::new(RedisTokenBlocklist::new(redis.clone())),
            oauth_states: Arc::new(RedisOAuthStates::new(redis.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub media: MediaStorage,
    pub providers: Arc<ProviderRegistry>,
    pub videos: Arc<dyn VideoStore>,
    pub queue: Arc<dyn QueueStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub users: Arc<dyn UserStore>,
    pub revoked: Arc<dyn TokenBlocklist>,
    pub oauth_states: Arc<dyn OAuthStateStore>,
    pub platforms: Arc<PlatformRegistry>,
    pub publisher: Arc<QueuePublisher>,
    pub renderer: Arc<RenderPipeline>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        media: MediaStorage,
        providers: ProviderRegistry,
        stores: Stores,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        let providers = Arc::new(providers);
        let renderer = Arc::new(RenderPipeline::new(
            stores.videos.clone(),
            providers.clone(),
            media.clone(),
            compositor,
        ));
        let platforms = Arc::new(PlatformRegistry::new());
        let publisher = Arc::new(QueuePublisher::new(
            stores.videos.clone(),
            stores.queue.clone(),
            platforms.clone(),
            media.clone(),
        ));

        Self {
            config,
            media,
            providers,
            videos: stores.videos,
            queue: stores.queue,
            accounts: stores.accounts,
            users: stores.users,
            revoked: stores.revoked,
            oauth_states: stores.oauth_states,
            platforms,
            publisher,
            renderer,
        }
    }

    /// Installs the social platforms. The queue publisher is rebuilt so it
    /// sees the same set.
    pub fn with_platforms(mut self, platforms: PlatformRegistry) -> Self {
        let platforms = Arc::new(platforms);
        self.publisher = Arc::new(QueuePublisher::new(
            self.videos.clone(),
            self.queue.clone(),
            platforms.clone(),
            self.media.clone(),
        ));
        self.platforms = platforms;
        self
    }
}
