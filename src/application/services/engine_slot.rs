use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::application::ports::TranscriptionEngine;

/// Process-wide handle to the transcription engine, filled once after the
/// model has loaded.
#[derive(Clone, Default)]
pub struct EngineSlot {
    inner: Arc<OnceCell<Arc<dyn TranscriptionEngine>>>,
}

impl EngineSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ready(engine: Arc<dyn TranscriptionEngine>) -> Self {
        let slot = Self::empty();
        slot.install(engine);
        slot
    }

    /// Returns `false` when an engine was already installed.
    pub fn install(&self, engine: Arc<dyn TranscriptionEngine>) -> bool {
        self.inner.set(engine).is_ok()
    }

    pub fn get(&self) -> Option<Arc<dyn TranscriptionEngine>> {
        self.inner.get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }
}
