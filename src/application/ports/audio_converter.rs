use std::path::Path;

/// Out-of-process converter used when the in-process codec gives up.
pub trait AudioConverter: Send + Sync {
    /// Converts `source` to mono 16 kHz WAV at `destination`.
    fn convert_to_canonical(&self, source: &Path, destination: &Path)
    -> Result<(), ConversionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("failed to launch converter: {0}")]
    Launch(String),
    #[error("converter exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },
    #[error("converter produced an empty file")]
    EmptyOutput,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
