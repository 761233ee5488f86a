use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::application::ports::{
    RawSegment, TranscriptionEngine, TranscriptionError, TranscriptionOutput,
    TranscriptionRequest,
};
use crate::domain::CanonicalAudio;

pub struct OpenAiWhisperEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiWhisperEngine {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| "whisper-1".to_string()),
        }
    }

    fn translations_url(&self) -> String {
        format!("{}/audio/translations", self.base_url)
    }
}

#[derive(Deserialize)]
struct VerboseResponse {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Option<Vec<VerboseSegment>>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct VerboseSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl TranscriptionEngine for OpenAiWhisperEngine {
    async fn transcribe(
        &self,
        audio: &CanonicalAudio,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutput, TranscriptionError> {
        let audio_data = tokio::fs::read(audio.path())
            .await
            .map_err(|e| TranscriptionError::InvalidAudio(format!("read: {}", e)))?;

        let file_part = multipart::Part::bytes(audio_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", file_part);

        // The translations endpoint detects the source language itself.
        if let Some(code) = request.language.code() {
            tracing::debug!(language = code, "Language hint not accepted by translations endpoint");
        }

        if !request.options.is_engine_defaults() {
            tracing::debug!(
                options = ?request.options,
                "Decoding options are not supported by the remote API, ignoring"
            );
        }

        let url = self.translations_url();
        tracing::debug!(model = %self.model, url = %url, "Sending audio to OpenAI Whisper API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::ApiRequestFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let result: VerboseResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("parse response: {}", e)))?;

        let segments: Vec<RawSegment> = match result.segments.filter(|s| !s.is_empty()) {
            Some(segments) => segments
                .into_iter()
                .map(|s| RawSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
            None if result.text.trim().is_empty() => Vec::new(),
            None => vec![RawSegment {
                start: 0.0,
                end: result.duration.unwrap_or(0.0),
                text: result.text,
            }],
        };

        tracing::info!(
            segments = segments.len(),
            "OpenAI Whisper transcription completed"
        );

        Ok(TranscriptionOutput::new(
            Box::new(segments.into_iter()),
            result.language,
        ))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
