use async_trait::async_trait;

use crate::domain::{CanonicalAudio, LanguageHint};

#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(
        &self,
        audio: &CanonicalAudio,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutput, TranscriptionError>;

    fn model_name(&self) -> &str;
}

/// Decoder knobs. `None` leaves the engine's own default in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodingOptions {
    pub beam_size: Option<usize>,
    pub best_of: Option<usize>,
    pub condition_on_previous_text: Option<bool>,
    pub word_timestamps: Option<bool>,
}

impl DecodingOptions {
    pub fn engine_defaults() -> Self {
        Self::default()
    }

    pub fn is_engine_defaults(&self) -> bool {
        *self == Self::default()
    }
}

/// Engines always translate the speech into English; `language` only names
/// the source.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub language: LanguageHint,
    pub options: DecodingOptions,
}

/// Segment as emitted by the engine, before indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Single-pass, non-restartable sequence of segments.
pub type SegmentStream = Box<dyn Iterator<Item = RawSegment> + Send>;

pub struct TranscriptionOutput {
    pub segments: SegmentStream,
    pub language: Option<String>,
}

impl TranscriptionOutput {
    pub fn new(segments: SegmentStream, language: Option<String>) -> Self {
        Self { segments, language }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("invalid audio input: {0}")]
    InvalidAudio(String),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
}
