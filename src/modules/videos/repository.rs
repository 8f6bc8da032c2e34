use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{NewVideo, Video, VideoStatus};
use crate::modules::providers::VideoProvider;

const VIDEO_COLUMNS: &str = "id, user_id, title, caption, duration, style, status, video_url, scenes, metadata, created_at, updated_at";

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: NewVideo) -> Result<Video, sqlx::Error>;

    async fn find(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, sqlx::Error>;

    async fn find_by_request_id(
        &self,
        provider: VideoProvider,
        request_id: &str,
    ) -> Result<Option<Video>, sqlx::Error>;

    /// Processing rows with a remote job that still has status checks left.
    async fn list_pollable(&self, max_attempts: u32) -> Result<Vec<Video>, sqlx::Error>;

    /// Writes back the mutable columns of a video.
    async fn update(&self, video: &Video) -> Result<(), sqlx::Error>;

    async fn set_status(&self, id: Uuid, status: VideoStatus) -> Result<(), sqlx::Error>;
}

#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VideoStore for PgVideoRepository {
    async fn create(&self, video: NewVideo) -> Result<Video, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO videos (user_id, title, caption, duration, style, status, video_url, scenes, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {VIDEO_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(video.user_id)
            .bind(&video.title)
            .bind(&video.caption)
            .bind(video.duration)
            .bind(&video.style)
            .bind(video.status)
            .bind(&video.video_url)
            .bind(Json(&video.scenes))
            .bind(Json(&video.metadata))
            .fetch_one(&self.pool)
            .await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Video>, sqlx::Error> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Video>, sqlx::Error> {
        let sql = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Video>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    async fn find_by_request_id(
        &self,
        provider: VideoProvider,
        request_id: &str,
    ) -> Result<Option<Video>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS} FROM videos
            WHERE metadata->'remote'->>'request_id' = $1
              AND metadata->'remote'->>'provider' = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(request_id)
            .bind(provider.as_str())
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_pollable(&self, max_attempts: u32) -> Result<Vec<Video>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {VIDEO_COLUMNS} FROM videos
            WHERE status = 'processing'
              AND metadata ? 'remote'
              AND COALESCE((metadata->'remote'->>'attempts')::int, 0) < $1
            ORDER BY created_at ASC
            "#
        );
        sqlx::query_as::<_, Video>(&sql)
            .bind(max_attempts as i32)
            .fetch_all(&self.pool)
            .await
    }

    async fn update(&self, video: &Video) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE videos
            SET title = $2, caption = $3, duration = $4, style = $5, status = $6,
                video_url = $7, scenes = $8, metadata = $9, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(video.id)
        .bind(&video.title)
        .bind(&video.caption)
        .bind(video.duration)
        .bind(&video.style)
        .bind(video.status)
        .bind(&video.video_url)
        .bind(&video.scenes)
        .bind(&video.metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, id: Uuid, status: VideoStatus) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE videos SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
