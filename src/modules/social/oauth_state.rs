use async_trait::async_trait;
use uuid::Uuid;

use super::model::Platform;
use crate::common::security::random_token;
use crate::infrastructure::redis::client::RedisService;

/// How long a connect link stays valid.
pub const OAUTH_STATE_TTL_SECS: u64 = 600;

/// One-time `state` nonces tying an OAuth callback back to the user who
/// started the flow.
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn issue(&self, user_id: Uuid, platform: Platform) -> Result<String, redis::RedisError>;

    /// Consumes a nonce. `None` when it is unknown, expired or issued for another platform.
    async fn consume(&self, state: &str, platform: Platform) -> Result<Option<Uuid>, redis::RedisError>;
}

#[derive(Clone)]
pub struct RedisOAuthStates {
    redis: RedisService,
}

impl RedisOAuthStates {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

fn key(state: &str) -> String {
    format!("oauth_state:{state}")
}

/// Stored value is `{platform}:{user_id}`.
pub(crate) fn decode(value: &str, platform: Platform) -> Option<Uuid> {
    let (stored_platform, user) = value.split_once(':')?;
    if stored_platform != platform.as_str() {
        return None;
    }
    Uuid::parse_str(user).ok()
}

#[async_trait]
impl OAuthStateStore for RedisOAuthStates {
    async fn issue(&self, user_id: Uuid, platform: Platform) -> Result<String, redis::RedisError> {
        let state = random_token(32);
        self.redis
            .set_ex(&key(&state), &format!("{platform}:{user_id}"), OAUTH_STATE_TTL_SECS)
            .await?;
        Ok(state)
    }

    async fn consume(&self, state: &str, platform: Platform) -> Result<Option<Uuid>, redis::RedisError> {
        if state.is_empty() || !state.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(None);
        }
        let value = self.redis.take(&key(state)).await?;
        Ok(value.and_then(|v| decode(&v, platform)))
    }
}
