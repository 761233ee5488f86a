use crate::application::ports::TranscriptionOutput;
use crate::domain::{LanguageHint, Segment, TranscriptionResult};

/// Materializes the engine's segment stream exactly once, in arrival order.
pub fn assemble(output: TranscriptionOutput, hint: &LanguageHint) -> TranscriptionResult {
    let segments: Vec<Segment> = output
        .segments
        .enumerate()
        .map(|(index, raw)| Segment {
            index,
            start: raw.start,
            end: raw.end,
            text: raw.text.trim().to_string(),
        })
        .collect();

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let language = output
        .language
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| hint.as_str().to_string());

    tracing::info!(
        segments = segments.len(),
        chars = text.len(),
        language = %language,
        "Transcription assembled"
    );

    TranscriptionResult {
        text,
        language,
        segments,
    }
}
