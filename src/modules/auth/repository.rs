use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::User;
use crate::infrastructure::redis::client::RedisService;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<User>, sqlx::Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by(&self, column: &str, value: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn create(&self, username: &str, email: &str, password_hash: &str) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.find_by("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.find_by("username", username).await
    }
}

/// Access tokens revoked by logout, kept until they would have expired anyway.
#[async_trait]
pub trait TokenBlocklist: Send + Sync {
    async fn revoke(&self, token: &str, ttl_seconds: u64) -> Result<(), redis::RedisError>;

    async fn is_revoked(&self, token: &str) -> Result<bool, redis::RedisError>;
}

#[derive(Clone)]
pub struct RedisTokenBlocklist {
    redis: RedisService,
}

impl RedisTokenBlocklist {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl TokenBlocklist for RedisTokenBlocklist {
    async fn revoke(&self, token: &str, ttl_seconds: u64) -> Result<(), redis::RedisError> {
        self.redis
            .set_ex(&format!("blocked_token:{token}"), "revoked", ttl_seconds.max(1))
            .await
    }

    async fn is_revoked(&self, token: &str) -> Result<bool, redis::RedisError> {
        self.redis.exists(&format!("blocked_token:{token}")).await
    }
}
