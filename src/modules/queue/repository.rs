use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{NewQueueEntry, PostRecord, QueueEntry};
use crate::modules::social::model::Platform;
use crate::modules::social::youtube::PRIVACY_STATUS;

const QUEUE_COLUMNS: &str = "id, video_id, user_id, scheduled_at, platforms, status, metadata, created_at, updated_at";

#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn create(&self, entry: NewQueueEntry) -> Result<QueueEntry, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error>;

    async fn find_for_video(&self, video_id: Uuid, user_id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QueueEntry>, sqlx::Error>;

    /// Queued entries scheduled at or before `now`, oldest first.
    async fn list_due(&self, now: OffsetDateTime) -> Result<Vec<QueueEntry>, sqlx::Error>;

    async fn update(&self, entry: &QueueEntry) -> Result<(), sqlx::Error>;

    async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error>;

    async fn record_post(&self, post: &PostRecord) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct PgQueueRepository {
    pool: PgPool,
}

impl PgQueueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for PgQueueRepository {
    async fn create(&self, entry: NewQueueEntry) -> Result<QueueEntry, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO video_queue (video_id, user_id, scheduled_at, platforms)
            VALUES ($1, $2, $3, $4)
            RETURNING {QUEUE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(entry.video_id)
            .bind(entry.user_id)
            .bind(entry.scheduled_at)
            .bind(Json(&entry.platforms))
            .fetch_one(&self.pool)
            .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM video_queue WHERE id = $1");
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_for_video(&self, video_id: Uuid, user_id: Uuid) -> Result<Option<QueueEntry>, sqlx::Error> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM video_queue WHERE video_id = $1 AND user_id = $2");
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(video_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM video_queue WHERE user_id = $1 ORDER BY scheduled_at ASC");
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn list_due(&self, now: OffsetDateTime) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let sql = format!(
            "SELECT {QUEUE_COLUMNS} FROM video_queue WHERE status = 'queued' AND scheduled_at <= $1 ORDER BY scheduled_at ASC"
        );
        sqlx::query_as::<_, QueueEntry>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await
    }

    async fn update(&self, entry: &QueueEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE video_queue
            SET scheduled_at = $2, platforms = $3, status = $4, metadata = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(entry.scheduled_at)
        .bind(&entry.platforms)
        .bind(entry.status)
        .bind(&entry.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM video_queue WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_post(&self, post: &PostRecord) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO social_uploads (user_id, video_id, queue_id, platform, platform_post_id, post_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.user_id)
        .bind(post.video_id)
        .bind(post.queue_id)
        .bind(post.platform.as_str())
        .bind(&post.post_id)
        .bind(&post.url)
        .execute(&mut *tx)
        .await?;

        if post.platform == Platform::YouTube {
            sqlx::query(
                r#"
                INSERT INTO youtube_uploads (user_id, video_id, youtube_video_id, title, privacy_status)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(post.user_id)
            .bind(post.video_id)
            .bind(&post.post_id)
            .bind(&post.title)
            .bind(PRIVACY_STATUS)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}
