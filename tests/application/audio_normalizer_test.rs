use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dictum::application::ports::{AudioCodec, AudioCodecError, DecodedAudio};
use dictum::application::services::{AudioNormalizer, NormalizationError};
use dictum::domain::{NormalizationTier, SniffedFormat};
use dictum::infrastructure::audio::SymphoniaCodec;

use crate::helpers::{MockConverter, build_wav, build_webm_opus, garbage_bytes};

struct Workspace {
    _dir: tempfile::TempDir,
    upload: PathBuf,
    output: PathBuf,
}

fn workspace(upload_name: &str, data: &[u8]) -> Workspace {
    let dir = tempfile::TempDir::new().unwrap();
    let upload = dir.path().join(upload_name);
    let output = dir.path().join("canonical.wav");
    std::fs::write(&upload, data).unwrap();
    Workspace {
        _dir: dir,
        upload,
        output,
    }
}

fn normalizer_with(converter: Arc<MockConverter>) -> AudioNormalizer {
    AudioNormalizer::new(Arc::new(SymphoniaCodec), converter)
}

/// Decodes anything but exports a header-only WAV.
struct HeaderOnlyCodec;

impl AudioCodec for HeaderOnlyCodec {
    fn decode(&self, _source: &Path, _hint: Option<&str>) -> Result<DecodedAudio, AudioCodecError> {
        Ok(DecodedAudio {
            samples: vec![0.1; 16_000],
            sample_rate: 16_000,
            source_channels: 1,
        })
    }

    fn export_canonical(
        &self,
        _audio: &DecodedAudio,
        destination: &Path,
    ) -> Result<u64, AudioCodecError> {
        std::fs::write(destination, [0u8; 44])?;
        Ok(44)
    }

    fn wav_header_duration(&self, path: &Path) -> Result<Duration, AudioCodecError> {
        SymphoniaCodec.wav_header_duration(path)
    }
}

#[test]
fn given_decodable_wav_when_normalizing_then_primary_tier_writes_canonical_wav() {
    let ws = workspace("upload.wav", &build_wav(44_100, 2, Duration::from_secs(1)));
    let converter = Arc::new(MockConverter::failing());

    let audio = normalizer_with(converter.clone())
        .normalize(&ws.upload, &ws.output, SniffedFormat::Wav)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::PrimaryDecode);
    assert_eq!(audio.path(), ws.output.as_path());
    let duration = audio.duration().unwrap();
    assert!(duration >= Duration::from_millis(990) && duration <= Duration::from_millis(1010));
    assert_eq!(converter.calls(), 0);

    let spec = hound::WavReader::open(&ws.output).unwrap().spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
}

#[test]
fn given_browser_webm_opus_when_normalizing_then_primary_tier_needs_no_converter() {
    let ws = workspace("recording.webm", &build_webm_opus(Duration::from_secs(2)));
    let converter = Arc::new(MockConverter::failing());

    let audio = normalizer_with(converter.clone())
        .normalize(&ws.upload, &ws.output, SniffedFormat::Webm)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::PrimaryDecode);
    assert_eq!(converter.calls(), 0);
    let duration = audio.duration().unwrap();
    assert!(duration >= Duration::from_millis(1_990) && duration <= Duration::from_secs(2));
    assert_eq!(hound::WavReader::open(&ws.output).unwrap().spec().sample_rate, 16_000);
}

#[test]
fn given_wav_bytes_labelled_webm_when_normalizing_then_converter_handles_them() {
    let ws = workspace("upload.webm", &build_wav(16_000, 1, Duration::from_secs(1)));
    let converter = Arc::new(MockConverter::writing(build_wav(
        16_000,
        1,
        Duration::from_secs(1),
    )));

    let audio = normalizer_with(converter.clone())
        .normalize(&ws.upload, &ws.output, SniffedFormat::Webm)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::ToolFallback);
    assert_eq!(converter.calls(), 1);
}

#[test]
fn given_zero_length_wav_when_normalizing_then_audio_too_short_without_fallback() {
    let ws = workspace("upload.wav", &build_wav(16_000, 1, Duration::ZERO));
    let converter = Arc::new(MockConverter::failing());

    let result = normalizer_with(converter.clone()).normalize(
        &ws.upload,
        &ws.output,
        SniffedFormat::Wav,
    );

    assert!(matches!(
        result,
        Err(NormalizationError::AudioTooShort { duration_ms: 0, .. })
    ));
    assert_eq!(converter.calls(), 0);
}

#[test]
fn given_converter_writes_header_only_wav_when_normalizing_webm_then_audio_too_short() {
    let ws = workspace("upload.webm", &garbage_bytes(2_048));
    let header_only = build_wav(16_000, 1, Duration::ZERO);
    assert!(header_only.len() < 100);
    let converter = Arc::new(MockConverter::writing(header_only));

    let result = normalizer_with(converter.clone()).normalize(
        &ws.upload,
        &ws.output,
        SniffedFormat::Webm,
    );

    assert!(matches!(
        result,
        Err(NormalizationError::AudioTooShort { duration_ms: 0, .. })
    ));
    assert_eq!(converter.calls(), 1);
}

#[test]
fn given_fifty_millisecond_wav_when_normalizing_then_stops_with_audio_too_short() {
    let ws = workspace("upload.wav", &build_wav(16_000, 1, Duration::from_millis(50)));
    let converter = Arc::new(MockConverter::failing());

    let result = normalizer_with(converter.clone()).normalize(
        &ws.upload,
        &ws.output,
        SniffedFormat::Wav,
    );

    match result {
        Err(NormalizationError::AudioTooShort {
            duration_ms,
            minimum_ms,
        }) => {
            assert!(duration_ms < minimum_ms);
            assert_eq!(minimum_ms, 100);
        }
        other => panic!("expected AudioTooShort, got {:?}", other),
    }
    assert_eq!(converter.calls(), 0);
}

#[test]
fn given_undecodable_upload_when_converter_succeeds_then_uses_tool_tier() {
    let ws = workspace("upload.webm", &garbage_bytes(2_048));
    let converter = Arc::new(MockConverter::writing(build_wav(
        16_000,
        1,
        Duration::from_secs(2),
    )));

    let audio = normalizer_with(converter.clone())
        .normalize(&ws.upload, &ws.output, SniffedFormat::Webm)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::ToolFallback);
    assert_eq!(audio.duration(), Some(Duration::from_secs(2)));
    assert_eq!(converter.calls(), 1);
}

#[test]
fn given_undecodable_webm_when_converter_fails_then_all_methods_fail() {
    let ws = workspace("upload.webm", &garbage_bytes(2_048));
    let converter = Arc::new(MockConverter::failing());

    let result = normalizer_with(converter.clone()).normalize(
        &ws.upload,
        &ws.output,
        SniffedFormat::Webm,
    );

    match result {
        Err(NormalizationError::AllConversionMethodsFailed { primary, tool }) => {
            assert!(primary.contains("decoding failed"));
            assert!(tool.contains("mock converter failure"));
        }
        other => panic!("expected AllConversionMethodsFailed, got {:?}", other),
    }
    assert_eq!(converter.calls(), 1);
}

#[test]
fn given_unreadable_wav_when_converter_fails_then_passes_original_bytes_through() {
    let original = garbage_bytes(2_048);
    let ws = workspace("upload.wav", &original);

    let audio = normalizer_with(Arc::new(MockConverter::failing()))
        .normalize(&ws.upload, &ws.output, SniffedFormat::Wav)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::PassThrough);
    assert_eq!(audio.path(), ws.upload.as_path());
    assert_eq!(audio.duration(), None);
    assert_eq!(audio.byte_len(), original.len() as u64);
    assert_eq!(std::fs::read(audio.path()).unwrap(), original);
}

#[test]
fn given_converter_output_too_short_when_normalizing_wav_then_skips_pass_through() {
    let ws = workspace("upload.wav", &garbage_bytes(2_048));
    let converter = Arc::new(MockConverter::writing(build_wav(
        16_000,
        1,
        Duration::from_millis(40),
    )));

    let result = normalizer_with(converter).normalize(&ws.upload, &ws.output, SniffedFormat::Wav);

    assert!(matches!(
        result,
        Err(NormalizationError::AudioTooShort { .. })
    ));
}

#[test]
fn given_converter_writes_tiny_file_when_normalizing_mp4_then_all_methods_fail() {
    let ws = workspace("upload.mp4", &garbage_bytes(2_048));
    let converter = Arc::new(MockConverter::writing(vec![0u8; 10]));

    let result = normalizer_with(converter).normalize(&ws.upload, &ws.output, SniffedFormat::Mp4);

    match result {
        Err(NormalizationError::AllConversionMethodsFailed { tool, .. }) => {
            assert!(tool.contains("too small"));
        }
        other => panic!("expected AllConversionMethodsFailed, got {:?}", other),
    }
}

#[test]
fn given_export_producing_header_only_file_when_normalizing_then_falls_back_to_converter() {
    let ws = workspace("upload.ogg", &garbage_bytes(2_048));
    let converter = Arc::new(MockConverter::writing(build_wav(
        16_000,
        1,
        Duration::from_secs(1),
    )));
    let normalizer = AudioNormalizer::new(Arc::new(HeaderOnlyCodec), converter.clone());

    let audio = normalizer
        .normalize(&ws.upload, &ws.output, SniffedFormat::Ogg)
        .unwrap();

    assert_eq!(audio.tier(), NormalizationTier::ToolFallback);
    assert_eq!(converter.calls(), 1);
}

#[test]
fn given_export_producing_header_only_file_when_converter_fails_then_reports_both_errors() {
    let ws = workspace("upload.ogg", &garbage_bytes(2_048));
    let normalizer =
        AudioNormalizer::new(Arc::new(HeaderOnlyCodec), Arc::new(MockConverter::failing()));

    let result = normalizer.normalize(&ws.upload, &ws.output, SniffedFormat::Ogg);

    match result {
        Err(NormalizationError::AllConversionMethodsFailed { primary, .. }) => {
            assert!(primary.contains("44 bytes"));
        }
        other => panic!("expected AllConversionMethodsFailed, got {:?}", other),
    }
}

#[test]
fn given_only_audio_too_short_when_checking_terminal_then_is_terminal() {
    let too_short = NormalizationError::AudioTooShort {
        duration_ms: 10,
        minimum_ms: 100,
    };
    let empty_export = NormalizationError::ExportProducedEmptyFile { size: 44 };

    assert!(too_short.is_terminal());
    assert!(!empty_export.is_terminal());
}
