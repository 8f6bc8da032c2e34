use async_trait::async_trait;

use crate::common::media::{MediaKind, MediaStorage};
use crate::modules::providers::requests::ImageRequest;
use crate::modules::providers::{MediaOutput, Provider, ProviderResult};

const WIDTH: u32 = 270;
const HEIGHT: u32 = 480;

/// Writes a vertical gradient as a binary PPM. The colours are derived from
/// the prompt, so a prompt always maps to the same file.
#[derive(Clone)]
pub struct GradientImageProvider {
    media: MediaStorage,
}

impl GradientImageProvider {
    pub fn new(media: MediaStorage) -> Self {
        Self { media }
    }
}

/// FNV-1a, stable across runs and platforms.
fn fingerprint(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

pub fn gradient_ppm(seed: u64, width: u32, height: u32) -> Vec<u8> {
    let top = [(seed >> 16) as u8, (seed >> 24) as u8, (seed >> 32) as u8];
    let bottom = [(seed >> 40) as u8, (seed >> 48) as u8, (seed >> 56) as u8];

    let mut image = format!("P6\n{width} {height}\n255\n").into_bytes();
    image.reserve((width * height * 3) as usize);
    for y in 0..height {
        let t = y as f32 / (height.max(2) - 1) as f32;
        let pixel: Vec<u8> = top
            .iter()
            .zip(bottom.iter())
            .map(|(a, b)| (*a as f32 + (*b as f32 - *a as f32) * t).round() as u8)
            .collect();
        for _ in 0..width {
            image.extend_from_slice(&pixel);
        }
    }
    image
}

/// A single-colour frame from `#rrggbb`; anything unparsable is black.
pub fn solid_ppm(hex: &str, width: u32, height: u32) -> Vec<u8> {
    let digits = hex.trim().trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    let pixel = if digits.len() == 6 {
        [channel(0), channel(2), channel(4)]
    } else {
        [0, 0, 0]
    };

    let mut image = format!("P6\n{width} {height}\n255\n").into_bytes();
    for _ in 0..width * height {
        image.extend_from_slice(&pixel);
    }
    image
}

#[async_trait]
impl Provider<ImageRequest> for GradientImageProvider {
    fn name(&self) -> &'static str {
        "gradient"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &ImageRequest) -> ProviderResult<MediaOutput> {
        let seed = fingerprint(&request.prompt);
        let file_name = format!("placeholder-{seed:016x}.ppm");
        let bytes = gradient_ppm(seed, WIDTH, HEIGHT);

        match self.media.write_bytes(MediaKind::Image, &file_name, &bytes).await {
            Ok(stored) => {
                let url = self.media.public_url(&stored.public_path);
                ProviderResult::success(format!("gradient-{seed:016x}"), MediaOutput::stored(url, stored))
            }
            Err(e) => ProviderResult::error(format!("gradient placeholder: {e:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ppm_has_header_and_full_pixel_buffer() {
        let image = gradient_ppm(fingerprint("sunset"), 4, 3);
        let header = b"P6\n4 3\n255\n";
        assert!(image.starts_with(header));
        assert_eq!(image.len(), header.len() + 4 * 3 * 3);
    }

    #[test]
    fn solid_frames_parse_hex_colours() {
        let image = solid_ppm("#ff8000", 1, 1);
        assert_eq!(&image[image.len() - 3..], &[0xff, 0x80, 0x00]);
        let fallback = solid_ppm("teal", 1, 1);
        assert_eq!(&fallback[fallback.len() - 3..], &[0, 0, 0]);
    }

    #[tokio::test]
    async fn same_prompt_gives_same_file() {
        let root = tempfile::tempdir().expect("tempdir");
        let media = MediaStorage::new(
            reqwest::Client::new(),
            root.path().join("renders"),
            root.path().join("images"),
            "http://localhost",
        );
        let provider = GradientImageProvider::new(media);

        let first = provider.generate(&ImageRequest::portrait("sunset")).await;
        let second = provider.generate(&ImageRequest::portrait("sunset")).await;
        assert_eq!(first, second);
        assert!(first.request_id().starts_with("gradient-"));
    }
}
