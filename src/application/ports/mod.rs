mod audio_codec;
mod audio_converter;
mod transcription_engine;

pub use audio_codec::{AudioCodec, AudioCodecError, DecodedAudio};
pub use audio_converter::{AudioConverter, ConversionError};
pub use transcription_engine::{
    DecodingOptions, RawSegment, SegmentStream, TranscriptionEngine, TranscriptionError,
    TranscriptionOutput, TranscriptionRequest,
};
