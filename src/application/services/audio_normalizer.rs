use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{AudioCodec, AudioCodecError, AudioConverter};
use crate::domain::{
    CanonicalAudio, MIN_AUDIO_DURATION, MIN_CANONICAL_BYTES, NormalizationTier, SniffedFormat,
};

/// Converts a staged upload into canonical mono 16 kHz WAV.
///
/// Tiers run in a fixed order: the in-process codec, then the external
/// converter on the original bytes, then (for WAV uploads only) the original
/// file as-is. Audio shorter than [`MIN_AUDIO_DURATION`] stops the chain at
/// whichever tier measures it.
pub struct AudioNormalizer {
    codec: Arc<dyn AudioCodec>,
    converter: Arc<dyn AudioConverter>,
}

enum Stage {
    PrimaryDecode,
    ToolFallback {
        primary_error: String,
    },
    PassThrough,
    Done(CanonicalAudio),
    Failed(NormalizationError),
}

impl AudioNormalizer {
    pub fn new(codec: Arc<dyn AudioCodec>, converter: Arc<dyn AudioConverter>) -> Self {
        Self { codec, converter }
    }

    pub fn normalize(
        &self,
        upload: &Path,
        output: &Path,
        format: SniffedFormat,
    ) -> Result<CanonicalAudio, NormalizationError> {
        let mut stage = Stage::PrimaryDecode;

        loop {
            stage = match stage {
                Stage::PrimaryDecode => match self.primary_tier(upload, output, format) {
                    Ok(audio) => Stage::Done(audio),
                    Err(e) if e.is_terminal() => Stage::Failed(e),
                    Err(e) => {
                        tracing::warn!(
                            format = %format,
                            error = %e,
                            "Primary decode failed, trying external converter"
                        );
                        Stage::ToolFallback {
                            primary_error: e.to_string(),
                        }
                    }
                },
                Stage::ToolFallback { primary_error } => match self.tool_tier(upload, output) {
                    Ok(audio) => Stage::Done(audio),
                    Err(e) if e.is_terminal() => Stage::Failed(e),
                    Err(e) if format.is_wav() => {
                        tracing::warn!(
                            error = %e,
                            "External conversion failed, passing WAV upload through"
                        );
                        Stage::PassThrough
                    }
                    Err(e) => {
                        tracing::error!(
                            format = %format,
                            primary_error = %primary_error,
                            tool_error = %e,
                            "All audio conversion methods failed"
                        );
                        Stage::Failed(NormalizationError::AllConversionMethodsFailed {
                            primary: primary_error,
                            tool: e.to_string(),
                        })
                    }
                },
                Stage::PassThrough => match self.pass_through(upload) {
                    Ok(audio) => Stage::Done(audio),
                    Err(e) => Stage::Failed(e),
                },
                Stage::Done(audio) => {
                    tracing::info!(
                        tier = %audio.tier(),
                        bytes = audio.byte_len(),
                        duration_ms = audio.duration().map(|d| d.as_millis() as u64),
                        "Audio normalized"
                    );
                    return Ok(audio);
                }
                Stage::Failed(e) => return Err(e),
            };
        }
    }

    fn primary_tier(
        &self,
        upload: &Path,
        output: &Path,
        format: SniffedFormat,
    ) -> Result<CanonicalAudio, NormalizationError> {
        let hint = format.decoder_hint();
        tracing::debug!(hint = hint.unwrap_or("auto"), "Decoding upload in-process");

        let decoded = self.codec.decode(upload, hint)?;
        let duration = decoded.duration();
        ensure_long_enough(duration)?;

        tracing::debug!(
            duration_ms = duration.as_millis() as u64,
            channels = decoded.source_channels,
            sample_rate = decoded.sample_rate,
            "Upload decoded"
        );

        let size = self.codec.export_canonical(&decoded, output)?;
        if size < MIN_CANONICAL_BYTES {
            return Err(NormalizationError::ExportProducedEmptyFile { size });
        }

        Ok(CanonicalAudio::new(
            output.to_path_buf(),
            size,
            Some(duration),
            NormalizationTier::PrimaryDecode,
        ))
    }

    fn tool_tier(&self, upload: &Path, output: &Path) -> Result<CanonicalAudio, NormalizationError> {
        self.converter
            .convert_to_canonical(upload, output)
            .map_err(|e| NormalizationError::ExternalConversionFailed(e.to_string()))?;

        let size = file_size(output)
            .map_err(|e| NormalizationError::ExternalConversionFailed(e.to_string()))?;

        // A readable header decides too-short before the byte floor does.
        let duration = match self.codec.wav_header_duration(output) {
            Ok(duration) => duration,
            Err(_) if size < MIN_CANONICAL_BYTES => {
                return Err(too_small(size));
            }
            Err(e) => {
                return Err(NormalizationError::ExternalConversionFailed(format!(
                    "unreadable output: {}",
                    e
                )));
            }
        };
        ensure_long_enough(duration)?;

        if size < MIN_CANONICAL_BYTES {
            return Err(too_small(size));
        }

        Ok(CanonicalAudio::new(
            output.to_path_buf(),
            size,
            Some(duration),
            NormalizationTier::ToolFallback,
        ))
    }

    fn pass_through(&self, upload: &Path) -> Result<CanonicalAudio, NormalizationError> {
        let size = file_size(upload).map_err(AudioCodecError::Io)?;

        let duration = match self.codec.wav_header_duration(upload) {
            Ok(duration) => {
                ensure_long_enough(duration)?;
                Some(duration)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pass-through WAV header unreadable, duration unknown");
                None
            }
        };

        Ok(CanonicalAudio::new(
            upload.to_path_buf(),
            size,
            duration,
            NormalizationTier::PassThrough,
        ))
    }
}

fn ensure_long_enough(duration: Duration) -> Result<(), NormalizationError> {
    if duration < MIN_AUDIO_DURATION {
        return Err(NormalizationError::AudioTooShort {
            duration_ms: duration.as_millis() as u64,
            minimum_ms: MIN_AUDIO_DURATION.as_millis() as u64,
        });
    }
    Ok(())
}

fn too_small(size: u64) -> NormalizationError {
    NormalizationError::ExternalConversionFailed(format!(
        "converted file too small: {} bytes",
        size
    ))
}

fn file_size(path: &Path) -> std::io::Result<u64> {
    std::fs::metadata(path).map(|m| m.len())
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    #[error("Audio too short: {duration_ms}ms (minimum {minimum_ms}ms)")]
    AudioTooShort { duration_ms: u64, minimum_ms: u64 },
    #[error("Converted WAV file too small: {size} bytes")]
    ExportProducedEmptyFile { size: u64 },
    #[error(transparent)]
    Codec(#[from] AudioCodecError),
    #[error("External conversion failed: {0}")]
    ExternalConversionFailed(String),
    #[error("All audio conversion methods failed. Primary error: {primary}, converter error: {tool}")]
    AllConversionMethodsFailed { primary: String, tool: String },
}

impl NormalizationError {
    /// A property of the source audio; no other tier can fix it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NormalizationError::AudioTooShort { .. })
    }
}
