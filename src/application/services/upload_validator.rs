use crate::domain::UploadedAudio;

/// No real audio container fits in fewer bytes than this.
pub const MIN_UPLOAD_BYTES: usize = 100;

pub fn validate_upload(upload: &UploadedAudio) -> Result<(), UploadError> {
    let size = upload.len();

    if size == 0 {
        return Err(UploadError::EmptyUpload);
    }
    if size < MIN_UPLOAD_BYTES {
        return Err(UploadError::UploadTooSmall {
            size,
            minimum: MIN_UPLOAD_BYTES,
        });
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Uploaded audio file is empty")]
    EmptyUpload,
    #[error("Audio file too small: {size} bytes (minimum {minimum} bytes)")]
    UploadTooSmall { size: usize, minimum: usize },
}
