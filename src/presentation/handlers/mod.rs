mod health;
mod models;
mod transcribe;

pub use health::{HealthResponse, health_handler};
pub use models::{ModelsResponse, models_handler};
pub use transcribe::{ErrorResponse, SegmentResponse, TranscribeResponse, transcribe_handler};
