use std::path::PathBuf;

use dictum::infrastructure::audio::TranscriptionProvider;
use dictum::presentation::config::{AudioSettings, TranscriptionSettings};
use dictum::presentation::{Environment, Settings};

#[test]
fn given_no_configuration_when_using_defaults_then_matches_service_defaults() {
    let settings = Settings::default();

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 9000);
    assert_eq!(settings.transcription.provider, TranscriptionProvider::Local);
    assert_eq!(settings.transcription.model, None);
    assert_eq!(settings.transcription.model_name(), "openai/whisper-small");
    assert_eq!(settings.audio.ffmpeg_path, PathBuf::from("ffmpeg"));
    assert_eq!(settings.logging.level, "info");
}

#[test]
fn given_max_upload_in_megabytes_when_converting_then_returns_bytes() {
    let audio = AudioSettings {
        max_upload_mb: 2,
        ..AudioSettings::default()
    };

    assert_eq!(audio.max_upload_bytes(), 2 * 1024 * 1024);
}

#[test]
fn given_no_scratch_dir_when_resolving_then_uses_system_temp_dir() {
    assert_eq!(AudioSettings::default().scratch_dir(), std::env::temp_dir());
}

#[test]
fn given_configured_scratch_dir_when_resolving_then_uses_it() {
    let audio = AudioSettings {
        scratch_dir: Some(PathBuf::from("/var/tmp/dictum")),
        ..AudioSettings::default()
    };

    assert_eq!(audio.scratch_dir(), PathBuf::from("/var/tmp/dictum"));
}

#[test]
fn given_repository_settings_file_when_loading_then_succeeds() {
    let settings = Settings::load(Environment::Test).unwrap();
    assert!(!settings.transcription.model_name().is_empty());
}

#[test]
fn given_openai_provider_without_model_when_resolving_then_uses_api_model_name() {
    let transcription = TranscriptionSettings {
        provider: TranscriptionProvider::OpenAi,
        ..TranscriptionSettings::default()
    };

    assert_eq!(transcription.model_name(), "whisper-1");
}

#[test]
fn given_configured_model_when_resolving_then_overrides_provider_default() {
    let transcription = TranscriptionSettings {
        provider: TranscriptionProvider::OpenAi,
        model: Some("whisper-large-v3".to_string()),
        ..TranscriptionSettings::default()
    };

    assert_eq!(transcription.model_name(), "whisper-large-v3");
}

#[test]
fn given_environment_names_when_parsing_then_accepts_aliases() {
    assert_eq!("production".parse::<Environment>(), Ok(Environment::Prod));
    assert_eq!("TEST".parse::<Environment>(), Ok(Environment::Test));
    assert!("staging".parse::<Environment>().is_err());
}
