use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use dictum::application::services::{AudioNormalizer, EngineSlot, TranscriptionService};
use dictum::infrastructure::audio::{
    FfmpegConverter, SymphoniaCodec, TranscriptionEngineFactory, check_ffmpeg_binary,
};
use dictum::infrastructure::observability::{TracingConfig, init_tracing};
use dictum::presentation::{AppState, Environment, ModelInfo, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment)?;

    let tracing_config = TracingConfig::new(
        environment.as_str(),
        settings.logging.enable_json,
        settings.logging.level.clone(),
    );
    init_tracing(&tracing_config)?;

    match check_ffmpeg_binary(&settings.audio.ffmpeg_path) {
        Ok(version) => tracing::info!(version = %version, "ffmpeg available"),
        Err(e) => tracing::warn!(
            error = %e,
            "ffmpeg unavailable, uploads the in-process decoder rejects will fail"
        ),
    }

    let scratch_dir = settings.audio.scratch_dir();
    std::fs::create_dir_all(&scratch_dir)?;

    let normalizer = Arc::new(AudioNormalizer::new(
        Arc::new(SymphoniaCodec),
        Arc::new(FfmpegConverter::new(settings.audio.ffmpeg_path.clone())),
    ));

    let engine = EngineSlot::empty();
    spawn_engine_loader(engine.clone(), &settings);

    let state = AppState {
        transcription_service: Arc::new(TranscriptionService::new(
            engine,
            normalizer,
            scratch_dir,
        )),
        model: ModelInfo {
            name: settings.transcription.model_name(),
            provider: settings.transcription.provider,
        },
        max_upload_bytes: settings.audio.max_upload_bytes(),
    };

    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!(port = settings.server.port, "Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Loads the model off the runtime; requests fail with "Model not loaded"
/// until it is installed.
fn spawn_engine_loader(slot: EngineSlot, settings: &Settings) {
    let transcription = settings.transcription.clone();

    tokio::task::spawn_blocking(move || {
        let model = transcription.model_name();
        tracing::info!(
            provider = %transcription.provider,
            model = %model,
            "Loading transcription engine"
        );

        match TranscriptionEngineFactory::create(
            transcription.provider,
            &model,
            transcription.api_key,
            transcription.base_url,
        ) {
            Ok(engine) => {
                slot.install(engine);
                tracing::info!("Transcription engine ready");
            }
            Err(e) => tracing::error!(error = %e, "Failed to load transcription engine"),
        }
    });
}
