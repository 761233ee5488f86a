use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::{LanguageHint, TranscriptionMode, TranscriptionResult, UploadedAudio};
use crate::presentation::state::AppState;

const AUDIO_FIELD: &str = "audio";
const LANGUAGE_FIELD: &str = "language";
const MODE_FIELD: &str = "mode";

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub language: String,
    pub segments: Vec<SegmentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub id: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<TranscriptionResult> for TranscribeResponse {
    fn from(result: TranscriptionResult) -> Self {
        Self {
            text: result.text,
            language: result.language,
            segments: result
                .segments
                .into_iter()
                .map(|s| SegmentResponse {
                    id: s.index,
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        }
    }
}

struct TranscribeForm {
    audio: Option<UploadedAudio>,
    language: LanguageHint,
    mode: TranscriptionMode,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn transcribe_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Transcribe request is not multipart");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(message) => {
            tracing::warn!(error = %message, "Failed to read multipart");
            return error_response(StatusCode::BAD_REQUEST, message);
        }
    };

    let upload = match form.audio {
        Some(upload) => upload,
        None => {
            tracing::warn!("Transcribe request with no audio file");
            return error_response(StatusCode::BAD_REQUEST, "No audio file provided".to_string());
        }
    };

    if upload.filename.as_deref() == Some("") {
        return error_response(StatusCode::BAD_REQUEST, "No audio file selected".to_string());
    }

    tracing::info!(
        language = %form.language,
        mode = %form.mode,
        bytes = upload.len(),
        "Transcription requested"
    );

    // The pipeline runs detached so a client disconnect cannot interrupt it
    // before its scratch files are cleaned up.
    let service = Arc::clone(&state.transcription_service);
    let language = form.language;
    let mode = form.mode;
    let outcome =
        tokio::spawn(async move { service.transcribe(upload, language, mode).await }).await;

    match outcome {
        Ok(Ok(result)) => {
            tracing::info!(
                language = %result.language,
                segments = result.segments.len(),
                chars = result.text.len(),
                "Transcription completed"
            );
            (StatusCode::OK, Json(TranscribeResponse::from(result))).into_response()
        }
        Ok(Err(e)) if e.is_client_error() => {
            tracing::warn!(error = %e, "Rejected upload");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, error_kind = ?e, "Transcription error");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Transcription task aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Transcription task aborted: {}", e),
            )
        }
    }
}

async fn read_form(mut multipart: Multipart) -> Result<TranscribeForm, String> {
    let mut form = TranscribeForm {
        audio: None,
        language: LanguageHint::Auto,
        mode: TranscriptionMode::Fast,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read multipart: {}", e))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some(AUDIO_FIELD) => {
                let filename = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file: {}", e))?;
                form.audio = Some(UploadedAudio::new(data.to_vec(), filename, content_type));
            }
            Some(LANGUAGE_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read language: {}", e))?;
                form.language = LanguageHint::parse(&value);
            }
            Some(MODE_FIELD) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Failed to read mode: {}", e))?;
                form.mode = TranscriptionMode::parse_lenient(&value);
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}
