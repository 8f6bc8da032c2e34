use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{AccountUpsert, ConnectedAccount, Platform};

const ACCOUNT_COLUMNS: &str = "id, user_id, platform, platform_user_id, platform_username, access_token, refresh_token, expires_at, is_active, created_at, updated_at";

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts or reactivates the user's account for a platform.
    async fn upsert(&self, account: AccountUpsert) -> Result<ConnectedAccount, sqlx::Error>;

    async fn find_active(&self, user_id: Uuid, platform: Platform) -> Result<Option<ConnectedAccount>, sqlx::Error>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ConnectedAccount>, sqlx::Error>;

    async fn update_tokens(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<time::OffsetDateTime>,
    ) -> Result<(), sqlx::Error>;

    /// Soft disconnect. Returns whether an active account existed.
    async fn deactivate(&self, user_id: Uuid, platform: Platform) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountRepository {
    async fn upsert(&self, account: AccountUpsert) -> Result<ConnectedAccount, sqlx::Error> {
        // A reconnect without a new refresh token keeps the stored one.
        let sql = format!(
            r#"
            INSERT INTO connected_accounts
                (user_id, platform, platform_user_id, platform_username, access_token, refresh_token, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
            ON CONFLICT (user_id, platform) DO UPDATE SET
                platform_user_id = EXCLUDED.platform_user_id,
                platform_username = EXCLUDED.platform_username,
                access_token = EXCLUDED.access_token,
                refresh_token = COALESCE(EXCLUDED.refresh_token, connected_accounts.refresh_token),
                expires_at = EXCLUDED.expires_at,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, ConnectedAccount>(&sql)
            .bind(account.user_id)
            .bind(account.platform.as_str())
            .bind(&account.platform_user_id)
            .bind(&account.platform_username)
            .bind(&account.access_token)
            .bind(&account.refresh_token)
            .bind(account.expires_at)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_active(&self, user_id: Uuid, platform: Platform) -> Result<Option<ConnectedAccount>, sqlx::Error> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts WHERE user_id = $1 AND platform = $2 AND is_active = TRUE"
        );
        sqlx::query_as::<_, ConnectedAccount>(&sql)
            .bind(user_id)
            .bind(platform.as_str())
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ConnectedAccount>, sqlx::Error> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM connected_accounts WHERE user_id = $1 ORDER BY platform");
        sqlx::query_as::<_, ConnectedAccount>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn update_tokens(
        &self,
        id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<time::OffsetDateTime>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE connected_accounts
            SET access_token = $2,
                refresh_token = COALESCE($3, refresh_token),
                expires_at = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn deactivate(&self, user_id: Uuid, platform: Platform) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE connected_accounts SET is_active = FALSE, updated_at = NOW() WHERE user_id = $1 AND platform = $2 AND is_active = TRUE",
        )
        .bind(user_id)
        .bind(platform.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
