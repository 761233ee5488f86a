use std::path::{Path, PathBuf};
use std::process::Command;

use crate::application::ports::{AudioConverter, ConversionError};
use crate::domain::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

const DEFAULT_FFMPEG: &str = "ffmpeg";
const MAX_STDERR_CHARS: usize = 2_000;

/// Shells out to ffmpeg to produce canonical WAV from whatever the upload is.
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    binary: PathBuf,
}

impl FfmpegConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for FfmpegConverter {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl AudioConverter for FfmpegConverter {
    fn convert_to_canonical(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<(), ConversionError> {
        tracing::info!(
            binary = %self.binary.display(),
            source = %source.display(),
            "Converting upload with ffmpeg"
        );

        let output = Command::new(&self.binary)
            .arg("-hide_banner")
            .arg("-nostdin")
            .arg("-i")
            .arg(source)
            .args(["-ac", &CANONICAL_CHANNELS.to_string()])
            .args(["-ar", &CANONICAL_SAMPLE_RATE.to_string()])
            .args(["-c:a", "pcm_s16le"])
            .arg("-y")
            .arg(destination)
            .output()
            .map_err(|e| ConversionError::Launch(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = tail(stderr.trim(), MAX_STDERR_CHARS);
            tracing::error!(status = %output.status, stderr = %stderr, "ffmpeg conversion failed");
            return Err(ConversionError::ToolFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let size = std::fs::metadata(destination)?.len();
        if size == 0 {
            return Err(ConversionError::EmptyOutput);
        }

        tracing::info!(bytes = size, "ffmpeg conversion successful");
        Ok(())
    }
}

/// Verifies that the ffmpeg binary can be executed.
pub fn check_ffmpeg_binary(binary: &Path) -> Result<String, ConversionError> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .map_err(|e| ConversionError::Launch(e.to_string()))?;

    if !output.status.success() {
        return Err(ConversionError::ToolFailed {
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    Ok(version)
}

// ffmpeg prints the actual error last.
fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
