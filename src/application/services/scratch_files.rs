use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::{Builder, TempPath};

use crate::domain::SniffedFormat;

const UPLOAD_PREFIX: &str = "dictum-upload-";
const CONVERTED_PREFIX: &str = "dictum-canonical-";

/// Owns the temporary files of one request and removes them when dropped.
///
/// At most two files exist: the staged upload and the converted WAV. Names
/// carry a random suffix so concurrent requests never collide. Removal
/// failures are logged and otherwise ignored.
pub struct ScratchFiles {
    dir: PathBuf,
    upload: Option<TempPath>,
    converted: Option<TempPath>,
}

impl ScratchFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            upload: None,
            converted: None,
        }
    }

    /// Writes the upload to disk with the extension of its sniffed format.
    pub fn stage_upload(&mut self, data: &[u8], format: SniffedFormat) -> io::Result<PathBuf> {
        let suffix = format!(".{}", format.extension());
        let mut file = Builder::new()
            .prefix(UPLOAD_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        file.write_all(data)?;
        file.flush()?;

        let path = file.into_temp_path();
        let staged = path.to_path_buf();
        tracing::debug!(path = %staged.display(), bytes = data.len(), "Staged upload");

        self.replace(Slot::Upload, path);
        Ok(staged)
    }

    /// Reserves a unique path for the converted WAV.
    pub fn reserve_converted(&mut self) -> io::Result<PathBuf> {
        let file = Builder::new()
            .prefix(CONVERTED_PREFIX)
            .suffix(".wav")
            .tempfile_in(&self.dir)?;

        let path = file.into_temp_path();
        let reserved = path.to_path_buf();
        self.replace(Slot::Converted, path);
        Ok(reserved)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.upload
            .iter()
            .chain(self.converted.iter())
            .map(|p| p.to_path_buf())
            .collect()
    }

    /// Removes every owned file. Safe to call more than once.
    pub fn release(&mut self) {
        for path in [self.upload.take(), self.converted.take()]
            .into_iter()
            .flatten()
        {
            remove(path);
        }
    }

    fn replace(&mut self, slot: Slot, path: TempPath) {
        let previous = match slot {
            Slot::Upload => self.upload.replace(path),
            Slot::Converted => self.converted.replace(path),
        };
        if let Some(previous) = previous {
            remove(previous);
        }
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.release();
    }
}

enum Slot {
    Upload,
    Converted,
}

fn remove(path: TempPath) {
    let shown = path.to_path_buf();
    match path.close() {
        Ok(()) => tracing::debug!(path = %shown.display(), "Removed scratch file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %shown.display(), error = %e, "Failed to remove scratch file")
        }
    }
}
