use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::common::scheduler::Tick;
use crate::modules::providers::registry::ProviderRegistry;
use crate::modules::videos::model::{PollOutcome, Video, MAX_STATUS_CHECKS};
use crate::modules::videos::repository::VideoStore;

/// Follows remote video jobs until they finish, fail or run out of checks.
pub struct StatusPoller {
    videos: Arc<dyn VideoStore>,
    providers: Arc<ProviderRegistry>,
}

impl StatusPoller {
    pub fn new(videos: Arc<dyn VideoStore>, providers: Arc<ProviderRegistry>) -> Self {
        Self { videos, providers }
    }

    async fn poll(&self, mut video: Video) -> anyhow::Result<PollOutcome> {
        let Some(remote) = video.remote().cloned() else {
            return Ok(PollOutcome::StillProcessing);
        };

        let result = self
            .providers
            .check_video_status(remote.provider, &remote.request_id)
            .await;
        let outcome = video.apply_status(&result, true);
        self.videos.update(&video).await?;

        match outcome {
            PollOutcome::Completed => info!("✅ Video {} finished on {}", video.id, remote.provider),
            PollOutcome::Failed | PollOutcome::TimedOut => warn!(
                "Video {} failed on {}: {}",
                video.id,
                remote.provider,
                video.metadata.last_error.as_deref().unwrap_or("unknown error")
            ),
            PollOutcome::StillProcessing => debug!("Video {} still processing", video.id),
        }
        Ok(outcome)
    }
}

#[async_trait]
impl Tick for StatusPoller {
    fn name(&self) -> &'static str {
        "status poller"
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let pending = self.videos.list_pollable(MAX_STATUS_CHECKS).await?;
        if pending.is_empty() {
            return Ok(());
        }

        debug!("Checking {} processing video(s)", pending.len());
        for video in pending {
            let id = video.id;
            // One bad row must not stall the rest.
            if let Err(e) = self.poll(video).await {
                error!("❌ Status check for video {} failed: {:#}", id, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::modules::providers::dispatcher::FallbackDispatcher;
    use crate::modules::providers::{MediaOutput, ProviderResult, VideoProvider};
    use crate::modules::videos::model::{sample_video, JobKind, JobMetadata, VideoStatus};
    use crate::test_support::{CallLog, InMemoryVideoStore, ScriptedProvider};

    fn registry(status: ProviderResult<MediaOutput>) -> Arc<ProviderRegistry> {
        let replicate = ScriptedProvider::<MediaOutput>::new("replicate", CallLog::default()).with_status(status);
        Arc::new(ProviderRegistry {
            script: FallbackDispatcher::new("script"),
            image: FallbackDispatcher::new("image"),
            video: FallbackDispatcher::new("video").with(VideoProvider::Replicate, Arc::new(replicate)),
            avatar: FallbackDispatcher::new("avatar"),
            speech: FallbackDispatcher::new("speech"),
        })
    }

    fn processing(attempts: u32) -> Video {
        let mut metadata = JobMetadata::new(JobKind::Manual).with_remote(VideoProvider::Replicate, "pred-1");
        if let Some(remote) = metadata.remote.as_mut() {
            remote.attempts = attempts;
        }
        sample_video(Uuid::new_v4(), VideoStatus::Processing, metadata)
    }

    #[tokio::test]
    async fn last_check_still_processing_times_out() {
        let store = Arc::new(InMemoryVideoStore::default());
        let video = store.insert(processing(MAX_STATUS_CHECKS - 1));
        let poller = StatusPoller::new(store.clone(), registry(ProviderResult::processing("pred-1")));

        poller.tick().await.expect("tick");

        let stored = store.get(video.id).expect("row");
        assert_eq!(stored.status, VideoStatus::Failed);
        assert!(stored.metadata.last_error.as_deref().unwrap_or_default().contains("timed out"));
    }

    #[tokio::test]
    async fn finished_job_completes_and_resets_attempts() {
        let store = Arc::new(InMemoryVideoStore::default());
        let video = store.insert(processing(3));
        let poller = StatusPoller::new(
            store.clone(),
            registry(ProviderResult::success("pred-1", MediaOutput::remote("https://cdn/out.mp4"))),
        );

        poller.tick().await.expect("tick");

        let stored = store.get(video.id).expect("row");
        assert_eq!(stored.status, VideoStatus::Completed);
        assert_eq!(stored.video_url.as_deref(), Some("https://cdn/out.mp4"));
        assert_eq!(stored.remote().map(|r| r.attempts), Some(0));
    }

    #[tokio::test]
    async fn exhausted_and_settled_rows_are_skipped() {
        let store = Arc::new(InMemoryVideoStore::default());
        let exhausted = store.insert(processing(MAX_STATUS_CHECKS));
        let mut done = processing(0);
        done.status = VideoStatus::Completed;
        let done = store.insert(done);
        let poller = StatusPoller::new(store.clone(), registry(ProviderResult::error("should not be called")));

        poller.tick().await.expect("tick");

        assert_eq!(store.get(exhausted.id).map(|v| v.status), Some(VideoStatus::Processing));
        assert_eq!(store.get(done.id).map(|v| v.status), Some(VideoStatus::Completed));
    }
}
