use std::sync::Arc;

use crate::application::ports::{
    DecodingOptions, TranscriptionEngine, TranscriptionOutput, TranscriptionRequest,
};
use crate::domain::{CanonicalAudio, LanguageHint, TranscriptionMode};

const ACCURATE_BEAM_SIZE: usize = 5;
const ACCURATE_BEST_OF: usize = 5;
const FAST_BEAM_SIZE: usize = 1;

/// Decoder options for the requested mode.
pub fn profile_for(mode: TranscriptionMode) -> DecodingOptions {
    match mode {
        TranscriptionMode::Accurate => DecodingOptions {
            beam_size: Some(ACCURATE_BEAM_SIZE),
            best_of: Some(ACCURATE_BEST_OF),
            condition_on_previous_text: Some(true),
            word_timestamps: Some(false),
        },
        TranscriptionMode::Fast => DecodingOptions {
            beam_size: Some(FAST_BEAM_SIZE),
            best_of: None,
            condition_on_previous_text: Some(false),
            word_timestamps: Some(false),
        },
    }
}

/// The two profiles tried in order: the mode's own, then the engine's defaults.
pub fn attempt_plan(mode: TranscriptionMode) -> [DecodingOptions; 2] {
    [profile_for(mode), DecodingOptions::engine_defaults()]
}

pub struct TranscriptionOrchestrator {
    engine: Arc<dyn TranscriptionEngine>,
}

impl TranscriptionOrchestrator {
    pub fn new(engine: Arc<dyn TranscriptionEngine>) -> Self {
        Self { engine }
    }

    /// Runs the engine with the mode's profile and falls back once to engine
    /// defaults. The task is always translation to English.
    pub async fn run(
        &self,
        audio: &CanonicalAudio,
        language: &LanguageHint,
        mode: TranscriptionMode,
    ) -> Result<TranscriptionOutput, OrchestrationError> {
        let mut last_error = None;

        for (attempt, options) in attempt_plan(mode).into_iter().enumerate() {
            let request = TranscriptionRequest {
                language: language.clone(),
                options,
            };

            tracing::info!(
                attempt = attempt + 1,
                mode = %mode,
                language = %language,
                engine_defaults = options.is_engine_defaults(),
                "Running transcription engine"
            );

            match self.engine.transcribe(audio, &request).await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Transcription attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let diagnostic = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no transcription attempt was made".to_string());
        Err(OrchestrationError::TranscriptionEngineFailed(diagnostic))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Transcription engine failed: {0}")]
    TranscriptionEngineFailed(String),
}
