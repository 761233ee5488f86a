use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::audio_normalizer::{AudioNormalizer, NormalizationError};
use crate::application::services::engine_slot::EngineSlot;
use crate::application::services::result_assembler::assemble;
use crate::application::services::scratch_files::ScratchFiles;
use crate::application::services::transcription_orchestrator::{
    OrchestrationError, TranscriptionOrchestrator,
};
use crate::application::services::upload_validator::{UploadError, validate_upload};
use crate::domain::{
    LanguageHint, SniffedFormat, TranscriptionMode, TranscriptionResult, UploadedAudio,
};

/// Runs one upload through validation, normalization, transcription and
/// assembly. Scratch files live exactly as long as a call.
pub struct TranscriptionService {
    engine: EngineSlot,
    normalizer: Arc<AudioNormalizer>,
    scratch_dir: PathBuf,
}

impl TranscriptionService {
    pub fn new(engine: EngineSlot, normalizer: Arc<AudioNormalizer>, scratch_dir: PathBuf) -> Self {
        Self {
            engine,
            normalizer,
            scratch_dir,
        }
    }

    pub fn engine(&self) -> &EngineSlot {
        &self.engine
    }

    pub async fn transcribe(
        &self,
        upload: UploadedAudio,
        language: LanguageHint,
        mode: TranscriptionMode,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let engine = self.engine.get().ok_or(TranscribeError::ModelNotLoaded)?;

        validate_upload(&upload)?;

        let format = SniffedFormat::sniff(upload.content_type(), upload.filename());
        tracing::info!(
            filename = upload.filename(),
            content_type = upload.content_type(),
            bytes = upload.len(),
            format = %format,
            "Upload accepted"
        );

        let mut scratch = ScratchFiles::new(&self.scratch_dir);
        let upload_path = scratch.stage_upload(&upload.data, format)?;
        let output_path = scratch.reserve_converted()?;
        drop(upload);

        let normalizer = Arc::clone(&self.normalizer);
        let canonical = tokio::task::spawn_blocking(move || {
            normalizer.normalize(&upload_path, &output_path, format)
        })
        .await
        .map_err(|e| TranscribeError::Worker(e.to_string()))??;

        let output = TranscriptionOrchestrator::new(engine)
            .run(&canonical, &language, mode)
            .await?;

        let result = assemble(output, &language);
        scratch.release();

        Ok(result)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),
    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
    #[error("pipeline worker failed: {0}")]
    Worker(String),
}

impl TranscribeError {
    /// Validation failures are the client's fault; everything else is ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, TranscribeError::Upload(_))
    }
}
