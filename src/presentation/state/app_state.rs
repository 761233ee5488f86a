use std::sync::Arc;

use crate::application::services::TranscriptionService;
use crate::infrastructure::audio::TranscriptionProvider;

#[derive(Clone)]
pub struct AppState {
    pub transcription_service: Arc<TranscriptionService>,
    pub model: ModelInfo,
    pub max_upload_bytes: usize,
}

/// Static description of the configured engine, reported by introspection
/// endpoints even before the model has finished loading.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub provider: TranscriptionProvider,
}
