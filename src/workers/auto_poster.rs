use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::common::scheduler::Tick;
use crate::modules::queue::publisher::QueuePublisher;
use crate::modules::queue::repository::QueueStore;

/// Publishes queue entries whose scheduled time has passed.
pub struct AutoPoster {
    queue: Arc<dyn QueueStore>,
    publisher: Arc<QueuePublisher>,
}

impl AutoPoster {
    pub fn new(queue: Arc<dyn QueueStore>, publisher: Arc<QueuePublisher>) -> Self {
        Self { queue, publisher }
    }
}

#[async_trait]
impl Tick for AutoPoster {
    fn name(&self) -> &'static str {
        "auto poster"
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let due = self.queue.list_due(OffsetDateTime::now_utc()).await?;
        if due.is_empty() {
            return Ok(());
        }

        info!("📤 {} queue entr(ies) due for posting", due.len());
        for entry in due {
            let id = entry.id;
            if let Err(e) = self.publisher.publish(entry).await {
                error!("❌ Auto-post of queue entry {} failed: {:#}", id, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::modules::queue::model::{sample_entry, QueueStatus};
    use crate::modules::social::model::Platform;
    use crate::modules::videos::model::{sample_video, JobKind, JobMetadata, VideoStatus};
    use crate::test_support::{empty_registry, FakePublisher, TestContext};

    #[tokio::test]
    async fn only_due_entries_are_published() {
        let mut ctx = TestContext::new(empty_registry());
        let youtube = FakePublisher::succeeding(Platform::YouTube);
        ctx.set_publishers(vec![youtube.clone()]);

        let user = Uuid::new_v4();
        let mut video = sample_video(user, VideoStatus::Queued, JobMetadata::new(JobKind::Manual));
        video.video_url = Some("/renders/clip.mp4".into());
        let video = ctx.videos.insert(video);

        let mut due = sample_entry(video.id, user, vec![Platform::YouTube]);
        due.scheduled_at = OffsetDateTime::now_utc() - time::Duration::minutes(5);
        let due = ctx.queue.insert(due);

        let mut later = sample_entry(Uuid::new_v4(), user, vec![Platform::YouTube]);
        later.scheduled_at = OffsetDateTime::now_utc() + time::Duration::hours(2);
        let later = ctx.queue.insert(later);

        let poster = AutoPoster::new(ctx.state.queue.clone(), ctx.state.publisher.clone());
        poster.tick().await.expect("tick");

        assert_eq!(youtube.published(), 1);
        assert_eq!(ctx.queue.get(due.id).map(|e| e.status), Some(QueueStatus::Posted));
        assert_eq!(ctx.queue.get(later.id).map(|e| e.status), Some(QueueStatus::Queued));

        // Posted entries are no longer due.
        poster.tick().await.expect("second tick");
        assert_eq!(youtube.published(), 1);
    }
}
