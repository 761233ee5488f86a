use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::infrastructure::audio::KNOWN_WHISPER_MODELS;
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<&'static str>,
    pub current_model: String,
    pub provider: String,
}

pub async fn models_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ModelsResponse {
            models: KNOWN_WHISPER_MODELS.to_vec(),
            current_model: state.model.name.clone(),
            provider: state.model.provider.to_string(),
        }),
    )
}
