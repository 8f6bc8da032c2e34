use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::PlatformError;
use super::model::{ConnectedAccount, Platform, PublishRequest, PublishedPost};

/// Posts finished videos to one social platform on a user's behalf.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn is_connected(&self, user_id: Uuid) -> Result<bool, PlatformError>;

    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost, PlatformError>;
}

/// Authorization-code flow for linking an account.
#[async_trait]
pub trait OAuthFlow: Send + Sync {
    fn authorization_url(&self, state: &str) -> Result<String, PlatformError>;

    /// Exchanges the callback code and stores the account.
    async fn connect(&self, user_id: Uuid, code: &str) -> Result<ConnectedAccount, PlatformError>;
}

/// A platform that can both link accounts and publish.
pub trait SocialPlatform: SocialPublisher + OAuthFlow {}

impl<T: SocialPublisher + OAuthFlow> SocialPlatform for T {}

/// Configured platforms keyed by [`Platform`].
#[derive(Default, Clone)]
pub struct PlatformRegistry {
    publishers: BTreeMap<Platform, Arc<dyn SocialPublisher>>,
    oauth: BTreeMap<Platform, Arc<dyn OAuthFlow>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platform<P: SocialPlatform + 'static>(mut self, platform: Arc<P>) -> Self {
        let kind = platform.platform();
        self.publishers.insert(kind, platform.clone());
        self.oauth.insert(kind, platform);
        self
    }

    /// Registers a publisher without an OAuth flow.
    pub fn with_publisher(mut self, publisher: Arc<dyn SocialPublisher>) -> Self {
        self.publishers.insert(publisher.platform(), publisher);
        self
    }

    pub fn publisher(&self, platform: Platform) -> Option<&Arc<dyn SocialPublisher>> {
        self.publishers.get(&platform)
    }

    pub fn oauth(&self, platform: Platform) -> Option<&Arc<dyn OAuthFlow>> {
        self.oauth.get(&platform)
    }

    pub fn configured(&self) -> Vec<Platform> {
        self.publishers.keys().copied().collect()
    }
}
