use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::common::media::{MediaKind, MediaStorage};
use crate::modules::providers::image::placeholder::solid_ppm;
use crate::modules::providers::registry::ProviderRegistry;
use crate::modules::providers::requests::{ImageRequest, SpeechRequest};
use crate::modules::providers::{MediaOutput, ProviderResult};
use crate::modules::videos::model::{Background, Video, VideoStatus};
use crate::modules::videos::repository::VideoStore;

const FRAME_WIDTH: u32 = 1080;
const FRAME_HEIGHT: u32 = 1920;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedScene {
    pub image: PathBuf,
    pub duration: u32,
}

/// Everything the compositor needs, all on local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub scenes: Vec<PlannedScene>,
    pub narration: Option<PathBuf>,
}

impl RenderPlan {
    pub fn total_duration(&self) -> u32 {
        self.scenes.iter().map(|s| s.duration).sum()
    }

    /// Input for ffmpeg's concat demuxer. The last frame is listed twice so
    /// its duration is honoured.
    pub fn concat_list(&self) -> String {
        let mut list = String::new();
        for scene in &self.scenes {
            list.push_str(&format!("file '{}'\nduration {}\n", escape(&scene.image), scene.duration));
        }
        if let Some(last) = self.scenes.last() {
            list.push_str(&format!("file '{}'\n", escape(&last.image)));
        }
        list
    }
}

fn escape(path: &Path) -> String {
    path.display().to_string().replace('\'', "'\\''")
}

/// Turns a render plan into an mp4.
#[async_trait]
pub trait Compositor: Send + Sync {
    async fn compose(&self, plan: &RenderPlan, output: &Path) -> Result<()>;
}

pub struct FfmpegCompositor {
    binary: String,
}

impl Default for FfmpegCompositor {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
        }
    }
}

#[async_trait]
impl Compositor for FfmpegCompositor {
    async fn compose(&self, plan: &RenderPlan, output: &Path) -> Result<()> {
        if plan.scenes.is_empty() {
            return Err(anyhow!("nothing to render: no scenes"));
        }

        let list_path = output.with_extension("txt");
        tokio::fs::write(&list_path, plan.concat_list()).await?;

        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
            w = FRAME_WIDTH,
            h = FRAME_HEIGHT
        );

        let mut command = Command::new(&self.binary);
        command.args(["-y", "-f", "concat", "-safe", "0", "-i"]).arg(&list_path);
        if let Some(narration) = &plan.narration {
            command.arg("-i").arg(narration);
        }
        command.args(["-vf", filter.as_str(), "-r", "30", "-c:v", "libx264", "-preset", "fast"]);
        if plan.narration.is_some() {
            command.args(["-c:a", "aac", "-shortest"]);
        }
        command.arg(output).stdout(Stdio::null()).stderr(Stdio::piped());

        info!("🎥 Running ffmpeg for {}", output.display());
        let result = command.output().await.context("spawning ffmpeg")?;
        let _ = tokio::fs::remove_file(&list_path).await;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: String = stderr.lines().rev().take(5).collect::<Vec<_>>().join(" | ");
            return Err(anyhow!("ffmpeg exited with {}: {}", result.status, tail));
        }
        Ok(())
    }
}

/// Renders a video's scenes into `/renders/{id}.mp4`: narration from the
/// speech providers, one background frame per scene, composed by a
/// [`Compositor`].
pub struct RenderPipeline {
    videos: Arc<dyn VideoStore>,
    providers: Arc<ProviderRegistry>,
    media: MediaStorage,
    compositor: Arc<dyn Compositor>,
}

impl RenderPipeline {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        providers: Arc<ProviderRegistry>,
        media: MediaStorage,
        compositor: Arc<dyn Compositor>,
    ) -> Self {
        Self {
            videos,
            providers,
            media,
            compositor,
        }
    }

    /// Runs the render and records the outcome on the row. The video is
    /// expected to be in `generating` already.
    pub async fn run(&self, mut video: Video) -> Result<Video> {
        match self.render(&video).await {
            Ok((public_path, duration)) => {
                info!("✅ Rendered video {} to {}", video.id, public_path);
                video.status = VideoStatus::Completed;
                video.video_url = Some(public_path);
                video.duration = duration as i32;
                video.metadata.last_error = None;
            }
            Err(e) => {
                error!("❌ Render of video {} failed: {:#}", video.id, e);
                video.status = VideoStatus::Failed;
                video.metadata.last_error = Some(format!("render failed: {e:#}"));
            }
        }
        self.videos.update(&video).await?;
        Ok(video)
    }

    async fn render(&self, video: &Video) -> Result<(String, u32)> {
        if video.scenes.is_empty() {
            return Err(anyhow!("video has no scenes"));
        }

        let narration = self.narrate(video).await;
        let mut scenes = Vec::with_capacity(video.scenes.len());
        for (index, scene) in video.scenes.iter().enumerate() {
            let image = self
                .background(video, index, &scene.background)
                .await
                .with_context(|| format!("background for scene {}", index + 1))?;
            scenes.push(PlannedScene {
                image,
                duration: scene.duration.max(1),
            });
        }

        let plan = RenderPlan { scenes, narration };
        let target = self.media.locate(MediaKind::Video, &format!("{}.mp4", video.id));
        if let Some(dir) = target.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        self.compositor.compose(&plan, &target.path).await?;
        Ok((target.public_path, plan.total_duration()))
    }

    /// Narration is optional: without a speech provider the video is silent.
    async fn narrate(&self, video: &Video) -> Option<PathBuf> {
        let text = video
            .scenes
            .iter()
            .map(|s| s.narration.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return None;
        }

        let request = SpeechRequest {
            text,
            voice_id: None,
            file_stem: format!("{}-narration", video.id),
        };
        let dispatched = self
            .providers
            .speech
            .dispatch(video.metadata.speech_provider, &request)
            .await;

        match dispatched.result {
            ProviderResult::Success { output, .. } => self.local_file(&output, MediaKind::Audio, "mp3").await.ok(),
            other => {
                warn!(
                    "rendering video {} without narration: {}",
                    video.id,
                    other.error_message().unwrap_or("speech still processing")
                );
                None
            }
        }
    }

    async fn background(&self, video: &Video, index: usize, background: &Background) -> Result<PathBuf> {
        match background {
            Background::Color { value } => {
                let stored = self
                    .media
                    .write_bytes(
                        MediaKind::Image,
                        &format!("{}-scene{}.ppm", video.id, index + 1),
                        &solid_ppm(value, FRAME_WIDTH / 4, FRAME_HEIGHT / 4),
                    )
                    .await?;
                Ok(stored.path)
            }
            Background::Image { url } => self.local_file(&MediaOutput::remote(url.clone()), MediaKind::Image, "jpg").await,
            Background::Prompt { text } => {
                let dispatched = self
                    .providers
                    .image
                    .dispatch(video.metadata.image_provider, &ImageRequest::portrait(text.clone()))
                    .await;
                match dispatched.result {
                    ProviderResult::Success { output, .. } => self.local_file(&output, MediaKind::Image, "jpg").await,
                    other => Err(anyhow!(
                        "no background image: {}",
                        other.error_message().unwrap_or("image still processing")
                    )),
                }
            }
        }
    }

    /// A path on disk for a generated file, downloading it if only the remote copy exists.
    async fn local_file(&self, output: &MediaOutput, kind: MediaKind, fallback_ext: &str) -> Result<PathBuf> {
        if let Some(file) = &output.file {
            return Ok(file.clone());
        }
        if let Some(path) = self.media.resolve_local(output.preferred_location()) {
            return Ok(path);
        }
        let ext = crate::common::media::extension_from_url(&output.url, fallback_ext);
        let stored = self
            .media
            .download(&output.url, kind, &format!("{}.{}", uuid::Uuid::new_v4(), ext))
            .await?;
        Ok(stored.path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::modules::providers::dispatcher::FallbackDispatcher;
    use crate::modules::providers::{ImageProvider, SpeechProvider};
    use crate::modules::videos::model::{sample_video, JobKind, JobMetadata, Scene};
    use crate::test_support::{CallLog, InMemoryVideoStore, ScriptedProvider};

    #[derive(Default)]
    struct RecordingCompositor {
        plans: Mutex<Vec<RenderPlan>>,
        fail: bool,
    }

    #[async_trait]
    impl Compositor for RecordingCompositor {
        async fn compose(&self, plan: &RenderPlan, output: &Path) -> Result<()> {
            if self.fail {
                return Err(anyhow!("encoder crashed"));
            }
            self.plans.lock().expect("lock").push(plan.clone());
            tokio::fs::write(output, b"mp4").await?;
            Ok(())
        }
    }

    fn registry(media: &MediaStorage, narration: &Path) -> ProviderRegistry {
        let log = CallLog::default();
        let speech = ScriptedProvider::new("elevenlabs", log.clone()).returning(ProviderResult::success(
            "tts-1",
            MediaOutput {
                url: "http://x/renders/audio/n.mp3".into(),
                local_path: Some("/renders/audio/n.mp3".into()),
                file: Some(narration.to_path_buf()),
            },
        ));
        ProviderRegistry {
            script: FallbackDispatcher::new("script"),
            image: FallbackDispatcher::new("image").with_placeholder(Arc::new(
                crate::modules::providers::image::GradientImageProvider::new(media.clone()),
            )),
            video: FallbackDispatcher::new("video"),
            avatar: FallbackDispatcher::new("avatar"),
            speech: FallbackDispatcher::new("speech").with(SpeechProvider::ElevenLabs, Arc::new(speech)),
        }
    }

    fn scripted_video() -> Video {
        let mut video = sample_video(uuid::Uuid::new_v4(), VideoStatus::Generating, JobMetadata::new(JobKind::Manual));
        video.scenes = sqlx::types::Json(vec![
            Scene {
                narration: "Hook line.".into(),
                text_overlay: None,
                duration: 4,
                background: Background::Color { value: "#202020".into() },
            },
            Scene {
                narration: "Main point.".into(),
                text_overlay: Some("Main".into()),
                duration: 6,
                background: Background::Prompt { text: "city at night".into() },
            },
        ]);
        video.metadata.image_provider = Some(ImageProvider::Pexels);
        video
    }

    #[test]
    fn concat_list_repeats_last_frame() {
        let plan = RenderPlan {
            scenes: vec![
                PlannedScene { image: "/a.png".into(), duration: 3 },
                PlannedScene { image: "/b's.png".into(), duration: 2 },
            ],
            narration: None,
        };
        assert_eq!(
            plan.concat_list(),
            "file '/a.png'\nduration 3\nfile '/b'\\''s.png'\nduration 2\nfile '/b'\\''s.png'\n"
        );
        assert_eq!(plan.total_duration(), 5);
    }

    #[tokio::test]
    async fn successful_render_completes_the_video() {
        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            reqwest::Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://x",
        );
        let narration = root.path().join("n.mp3");
        let store = Arc::new(InMemoryVideoStore::default());
        let video = store.insert(scripted_video());
        let compositor = Arc::new(RecordingCompositor::default());

        let pipeline = RenderPipeline::new(
            store.clone(),
            Arc::new(registry(&media, &narration)),
            media,
            compositor.clone(),
        );
        let rendered = pipeline.run(video.clone()).await.expect("run");

        assert_eq!(rendered.status, VideoStatus::Completed);
        assert_eq!(rendered.video_url, Some(format!("/renders/{}.mp4", video.id)));
        assert_eq!(rendered.duration, 10);
        assert!(root.path().join("renders").join(format!("{}.mp4", video.id)).exists());

        let plans = compositor.plans.lock().expect("lock");
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].narration.as_deref(), Some(narration.as_path()));
        assert_eq!(plans[0].scenes.len(), 2);

        let stored = store.get(video.id).expect("stored");
        assert_eq!(stored.status, VideoStatus::Completed);
    }

    #[tokio::test]
    async fn compositor_failure_marks_the_video_failed() {
        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            reqwest::Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://x",
        );
        let store = Arc::new(InMemoryVideoStore::default());
        let video = store.insert(scripted_video());
        let compositor = Arc::new(RecordingCompositor {
            fail: true,
            ..Default::default()
        });

        let pipeline = RenderPipeline::new(
            store.clone(),
            Arc::new(registry(&media, &root.path().join("n.mp3"))),
            media,
            compositor,
        );
        let rendered = pipeline.run(video).await.expect("run");

        assert_eq!(rendered.status, VideoStatus::Failed);
        assert!(rendered.metadata.last_error.as_deref().unwrap_or_default().contains("encoder crashed"));
    }
}
