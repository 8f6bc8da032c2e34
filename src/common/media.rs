use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use futures_util::TryStreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::info;

/// Where a generated artifact lives on disk and how the static file server exposes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub path: PathBuf,
    /// Path under the backend origin, e.g. `/renders/abc.mp4`.
    pub public_path: String,
}

/// Local media directories served at `/renders` and `/images`.
#[derive(Clone, Debug)]
pub struct MediaStorage {
    client: Client,
    renders_dir: PathBuf,
    images_dir: PathBuf,
    backend_url: String,
}

impl MediaStorage {
    pub fn new(client: Client, renders_dir: PathBuf, images_dir: PathBuf, backend_url: &str) -> Self {
        Self {
            client,
            renders_dir,
            images_dir,
            backend_url: backend_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.renders_dir, &self.images_dir, &self.audio_dir()] {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn renders_dir(&self) -> &Path {
        &self.renders_dir
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    fn audio_dir(&self) -> PathBuf {
        self.renders_dir.join("audio")
    }

    fn dir_for(&self, kind: MediaKind) -> (PathBuf, &'static str) {
        match kind {
            MediaKind::Video => (self.renders_dir.clone(), "/renders"),
            MediaKind::Image => (self.images_dir.clone(), "/images"),
            MediaKind::Audio => (self.audio_dir(), "/renders/audio"),
        }
    }

    /// Where a file of this kind would be stored, without touching the disk.
    pub fn locate(&self, kind: MediaKind, file_name: &str) -> StoredMedia {
        let (dir, prefix) = self.dir_for(kind);
        StoredMedia {
            path: dir.join(file_name),
            public_path: format!("{prefix}/{file_name}"),
        }
    }

    /// Absolute URL for a public path; remote URLs pass through untouched.
    pub fn public_url(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}{}", self.backend_url, location)
        }
    }

    /// Maps `/renders/...` or `/images/...` back to a file on disk.
    pub fn resolve_local(&self, location: &str) -> Option<PathBuf> {
        let (base, rest) = if let Some(rest) = location.strip_prefix("/renders/") {
            (&self.renders_dir, rest)
        } else if let Some(rest) = location.strip_prefix("/images/") {
            (&self.images_dir, rest)
        } else {
            return None;
        };

        let relative = Path::new(rest);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(base.join(relative))
    }

    pub async fn write_bytes(&self, kind: MediaKind, file_name: &str, bytes: &[u8]) -> Result<StoredMedia> {
        let stored = self.locate(kind, file_name);
        if let Some(parent) = stored.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&stored.path, bytes)
            .await
            .with_context(|| format!("writing {}", stored.path.display()))?;
        Ok(stored)
    }

    /// Streams a remote file to disk.
    pub async fn download(&self, url: &str, kind: MediaKind, file_name: &str) -> Result<StoredMedia> {
        let stored = self.locate(kind, file_name);
        if let Some(parent) = stored.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        info!("⬇️ Downloading {} -> {}", url, stored.path.display());
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("download of {} failed with HTTP {}", url, response.status()));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = fs::File::create(&stored.path).await?;
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        info!("⬇️ Stored {} bytes at {}", written, stored.public_path);
        Ok(stored)
    }

    /// Bytes of a stored or remote video, used by uploads that need the file itself.
    pub async fn read(&self, location: &str) -> Result<Vec<u8>> {
        if let Some(path) = self.resolve_local(location) {
            return fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()));
        }

        let response = self.client.get(location).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("fetch of {} failed with HTTP {}", location, response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// File extension from a URL path, falling back when there is none.
pub fn extension_from_url<'a>(url: &'a str, fallback: &'a str) -> &'a str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MediaStorage {
        MediaStorage::new(
            Client::new(),
            PathBuf::from("/srv/renders"),
            PathBuf::from("/srv/images"),
            "http://api.example.com/",
        )
    }

    #[test]
    fn public_urls_are_prefixed_with_backend_origin() {
        let media = storage();
        assert_eq!(media.public_url("/renders/a.mp4"), "http://api.example.com/renders/a.mp4");
        assert_eq!(media.public_url("https://cdn.example.com/a.mp4"), "https://cdn.example.com/a.mp4");
    }

    #[test]
    fn resolve_local_rejects_traversal() {
        let media = storage();
        assert_eq!(
            media.resolve_local("/renders/audio/n.mp3"),
            Some(PathBuf::from("/srv/renders/audio/n.mp3"))
        );
        assert_eq!(media.resolve_local("/images/../etc/passwd"), None);
        assert_eq!(media.resolve_local("https://cdn.example.com/a.mp4"), None);
    }

    #[test]
    fn extension_is_taken_from_the_url_path() {
        assert_eq!(extension_from_url("https://x.io/v/clip.webm?sig=1", "mp4"), "webm");
        assert_eq!(extension_from_url("https://x.io/v/clip", "mp4"), "mp4");
        assert_eq!(extension_from_url("https://x.io/v/clip.", "mp4"), "mp4");
    }

    #[tokio::test]
    async fn write_bytes_creates_directories() {
        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://localhost:3000",
        );

        let stored = media
            .write_bytes(MediaKind::Audio, "voice.mp3", b"ID3")
            .await
            .expect("write");

        assert_eq!(stored.public_path, "/renders/audio/voice.mp3");
        assert_eq!(tokio::fs::read(&stored.path).await.expect("read"), b"ID3");
    }
}
