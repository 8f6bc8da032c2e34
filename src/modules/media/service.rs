use tracing::info;
use uuid::Uuid;

use super::dto::{ImageGenerationRequest, MediaResponse, SpeechGenerationRequest};
use crate::common::error::{AppError, AppResult};
use crate::modules::providers::dispatcher::Dispatched;
use crate::modules::providers::requests::{ImageRequest, SpeechRequest};
use crate::modules::providers::{MediaOutput, ProviderResult};
use crate::state::AppState;

pub struct MediaService;

fn into_response<K: ToString>(state: &AppState, dispatched: Dispatched<K, MediaOutput>) -> AppResult<MediaResponse> {
    match dispatched.result {
        ProviderResult::Success { request_id, output } => Ok(MediaResponse {
            url: state.media.public_url(output.preferred_location()),
            request_id,
            provider: dispatched.provider.map(|p| p.to_string()),
        }),
        ProviderResult::Processing { request_id } => Err(AppError::Provider(format!(
            "generation {request_id} is still running"
        ))),
        ProviderResult::Error { error } => Err(AppError::Provider(error)),
    }
}

impl MediaService {
    pub async fn generate_image(state: &AppState, body: ImageGenerationRequest) -> AppResult<MediaResponse> {
        let mut request = ImageRequest::portrait(body.prompt.trim());
        if let Some(width) = body.width {
            request.width = width;
        }
        if let Some(height) = body.height {
            request.height = height;
        }

        let dispatched = state.providers.image.dispatch(body.provider, &request).await;
        let response = into_response(state, dispatched)?;
        info!("🖼️ Image ready at {}", response.url);
        Ok(response)
    }

    pub async fn generate_speech(
        state: &AppState,
        body: SpeechGenerationRequest,
    ) -> AppResult<MediaResponse> {
        let request = SpeechRequest {
            text: body.text,
            voice_id: body.voice_id,
            file_stem: format!("speech-{}", Uuid::new_v4()),
        };

        let dispatched = state.providers.speech.dispatch(body.provider, &request).await;
        let response = into_response(state, dispatched)?;
        info!("🔊 Speech ready at {}", response.url);
        Ok(response)
    }
}
