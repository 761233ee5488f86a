mod candle_whisper_engine;
mod ffmpeg_converter;
mod openai_whisper_engine;
mod opus_decoder;
mod symphonia_codec;
mod transcription_engine_factory;
mod whisper_languages;

pub use candle_whisper_engine::CandleWhisperEngine;
pub use ffmpeg_converter::{FfmpegConverter, check_ffmpeg_binary};
pub use openai_whisper_engine::OpenAiWhisperEngine;
pub use symphonia_codec::{SymphoniaCodec, read_canonical_samples};
pub use transcription_engine_factory::{TranscriptionEngineFactory, TranscriptionProvider};
pub use whisper_languages::{KNOWN_WHISPER_MODELS, WHISPER_LANGUAGES};
