use std::sync::Arc;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use tracing::{info, warn};

use super::model::{PlatformFailure, PlatformSuccess, PostRecord, QueueEntry, QueueStatus};
use super::repository::QueueStore;
use crate::common::media::MediaStorage;
use crate::modules::social::model::PublishRequest;
use crate::modules::social::publisher::PlatformRegistry;
use crate::modules::videos::model::{JobKind, Video, VideoStatus};
use crate::modules::videos::repository::VideoStore;

/// Publishes one queue entry to each of its pending platforms. Shared by the
/// auto-poster and "post now".
pub struct QueuePublisher {
    videos: Arc<dyn VideoStore>,
    queue: Arc<dyn QueueStore>,
    platforms: Arc<PlatformRegistry>,
    media: MediaStorage,
}

/// Script hashtags when the video came from a topic, else `#words` in the caption.
pub fn hashtags_for(video: &Video) -> Vec<String> {
    if let JobKind::Script { hashtags, .. } = &video.metadata.job {
        return hashtags.clone();
    }
    video
        .caption
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|word| word.strip_prefix('#'))
        .map(|tag| tag.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_').to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn description_for(video: &Video) -> String {
    let caption = video.caption.as_deref().unwrap_or_default();
    // Inline tags are passed separately.
    caption
        .split_whitespace()
        .filter(|word| !word.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ")
}

impl QueuePublisher {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        queue: Arc<dyn QueueStore>,
        platforms: Arc<PlatformRegistry>,
        media: MediaStorage,
    ) -> Self {
        Self {
            videos,
            queue,
            platforms,
            media,
        }
    }

    /// Attempts every pending platform, even after one fails, then stores
    /// the entry as `posted` when all succeeded and `failed` otherwise.
    pub async fn publish(&self, mut entry: QueueEntry) -> Result<QueueEntry> {
        let targets = entry.pending_platforms();
        let video = self
            .videos
            .find(entry.video_id)
            .await
            .with_context(|| format!("loading video {}", entry.video_id))?;

        let mut failures = Vec::new();
        match video.as_ref().filter(|v| v.video_url.is_some()) {
            None => {
                let reason = match video {
                    None => "video no longer exists",
                    Some(_) => "video has no rendered file",
                };
                failures.extend(targets.iter().map(|p| PlatformFailure {
                    platform: *p,
                    error: reason.to_string(),
                }));
            }
            Some(video) => {
                let location = video.video_url.clone().unwrap_or_default();
                let request = PublishRequest {
                    user_id: entry.user_id,
                    video_id: video.id,
                    title: video.title.clone(),
                    description: description_for(video),
                    hashtags: hashtags_for(video),
                    public_url: self.media.public_url(&location),
                    location,
                };

                for platform in &targets {
                    let Some(publisher) = self.platforms.publisher(*platform) else {
                        failures.push(PlatformFailure {
                            platform: *platform,
                            error: format!("{platform} is not configured on this server"),
                        });
                        continue;
                    };

                    match publisher.publish(&request).await {
                        Ok(post) => {
                            info!("📣 Video {} posted to {} as {}", video.id, platform, post.post_id);
                            let record = PostRecord {
                                user_id: entry.user_id,
                                video_id: video.id,
                                queue_id: Some(entry.id),
                                platform: *platform,
                                post_id: post.post_id.clone(),
                                url: post.url.clone(),
                                title: video.title.chars().take(255).collect(),
                            };
                            if let Err(e) = self.queue.record_post(&record).await {
                                warn!("could not record {} post {}: {}", platform, post.post_id, e);
                                entry.metadata.unrecorded.push(PlatformFailure {
                                    platform: *platform,
                                    error: format!("post {} was published but not recorded: {}", post.post_id, e),
                                });
                            }
                            entry.metadata.succeeded.push(PlatformSuccess {
                                platform: *platform,
                                post_id: post.post_id,
                                url: post.url,
                            });
                        }
                        Err(e) => {
                            warn!("{} publish of video {} failed: {}", platform, video.id, e);
                            failures.push(PlatformFailure {
                                platform: *platform,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        entry.metadata.failures = failures;
        entry.metadata.last_attempt_at = Some(OffsetDateTime::now_utc());
        entry.status = if entry.metadata.failures.is_empty() {
            QueueStatus::Posted
        } else {
            QueueStatus::Failed
        };

        self.queue
            .update(&entry)
            .await
            .with_context(|| format!("saving queue entry {}", entry.id))?;

        if entry.status == QueueStatus::Posted {
            self.videos
                .set_status(entry.video_id, VideoStatus::Posted)
                .await
                .with_context(|| format!("marking video {} posted", entry.video_id))?;
        }

        info!(
            "📬 Queue entry {} {} ({} ok, {} failed)",
            entry.id,
            if entry.status == QueueStatus::Posted { "posted" } else { "failed" },
            entry.metadata.succeeded.len(),
            entry.metadata.failures.len()
        );
        Ok(entry)
    }
}
