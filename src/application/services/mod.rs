mod audio_normalizer;
mod engine_slot;
mod result_assembler;
mod scratch_files;
mod transcription_orchestrator;
mod transcription_service;
mod upload_validator;

pub use audio_normalizer::{AudioNormalizer, NormalizationError};
pub use engine_slot::EngineSlot;
pub use result_assembler::assemble;
pub use scratch_files::ScratchFiles;
pub use transcription_orchestrator::{
    OrchestrationError, TranscriptionOrchestrator, attempt_plan, profile_for,
};
pub use transcription_service::{TranscribeError, TranscriptionService};
pub use upload_validator::{MIN_UPLOAD_BYTES, UploadError, validate_upload};
