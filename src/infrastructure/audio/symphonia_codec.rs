use std::fs::File;
use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::formats::{
    IsoMp4Reader, MkvReader, OggReader, WavReader as SymphoniaWavReader,
};

use crate::application::ports::{AudioCodec, AudioCodecError, DecodedAudio};
use crate::domain::{CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};

use super::opus_decoder::codec_registry;

/// In-process codec: symphonia (with libopus for Opus tracks) for decoding,
/// rubato for resampling and hound for writing the canonical WAV.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaCodec;

impl AudioCodec for SymphoniaCodec {
    fn decode(&self, source: &Path, hint: Option<&str>) -> Result<DecodedAudio, AudioCodecError> {
        let file = File::open(source)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut format = open_container(mss, hint)?;

        let track = format
            .default_track()
            .ok_or_else(|| AudioCodecError::DecodingFailed("no audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let mut sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| AudioCodecError::DecodingFailed("unknown sample rate".to_string()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count())
            .or_else(|| codec_params.channel_layout.map(|l| l.into_channels().count()))
            .unwrap_or(1);

        let mut decoder = codec_registry()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioCodecError::DecodingFailed(format!("codec: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioCodecError::DecodingFailed(format!("packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!(error = %e, "Skipping corrupt audio frame");
                    continue;
                }
                Err(e) => {
                    return Err(AudioCodecError::DecodingFailed(format!("decode: {}", e)));
                }
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            if num_frames == 0 {
                continue;
            }
            // Opus always decodes at 48 kHz whatever the container declares.
            sample_rate = spec.rate;

            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let interleaved = sample_buf.samples();

            let frame_channels = spec.channels.count().max(1);
            if frame_channels > 1 {
                for frame in interleaved.chunks(frame_channels) {
                    samples.push(frame.iter().sum::<f32>() / frame_channels as f32);
                }
            } else {
                samples.extend_from_slice(interleaved);
            }
        }

        // Zero frames is zero-length audio; the caller's duration check rejects it.
        if samples.is_empty() {
            tracing::debug!(track_id, "Track opened but yielded no audio frames");
        }

        Ok(DecodedAudio {
            samples,
            sample_rate,
            source_channels: channels,
        })
    }

    fn export_canonical(
        &self,
        audio: &DecodedAudio,
        destination: &Path,
    ) -> Result<u64, AudioCodecError> {
        let samples = if audio.sample_rate != CANONICAL_SAMPLE_RATE {
            resample(&audio.samples, audio.sample_rate, CANONICAL_SAMPLE_RATE)?
        } else {
            audio.samples.clone()
        };

        let spec = WavSpec {
            channels: CANONICAL_CHANNELS,
            sample_rate: CANONICAL_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(destination, spec)
            .map_err(|e| AudioCodecError::EncodingFailed(format!("create: {}", e)))?;
        for sample in &samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| AudioCodecError::EncodingFailed(format!("write: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| AudioCodecError::EncodingFailed(format!("finalize: {}", e)))?;

        let size = std::fs::metadata(destination)?.len();

        tracing::debug!(
            samples = samples.len(),
            bytes = size,
            "Exported 16kHz mono PCM WAV"
        );

        Ok(size)
    }

    fn wav_header_duration(&self, path: &Path) -> Result<Duration, AudioCodecError> {
        let reader = WavReader::open(path)
            .map_err(|e| AudioCodecError::DecodingFailed(format!("wav header: {}", e)))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(AudioCodecError::DecodingFailed(
                "wav header declares a zero sample rate".to_string(),
            ));
        }
        Ok(Duration::from_secs_f64(
            reader.duration() as f64 / spec.sample_rate as f64,
        ))
    }
}

/// Opens the container named by `hint` with its own reader. Content
/// detection only runs when there is no hint, so mislabelled uploads fail
/// here and fall through to the external converter.
fn open_container(
    mss: MediaSourceStream,
    hint: Option<&str>,
) -> Result<Box<dyn FormatReader>, AudioCodecError> {
    let options = FormatOptions::default();

    let reader: symphonia::core::errors::Result<Box<dyn FormatReader>> = match hint {
        Some("webm" | "mkv") => {
            MkvReader::try_new(mss, &options).map(|r| Box::new(r) as Box<dyn FormatReader>)
        }
        Some("mp4" | "m4a") => {
            IsoMp4Reader::try_new(mss, &options).map(|r| Box::new(r) as Box<dyn FormatReader>)
        }
        Some("ogg") => {
            OggReader::try_new(mss, &options).map(|r| Box::new(r) as Box<dyn FormatReader>)
        }
        Some("wav") => SymphoniaWavReader::try_new(mss, &options)
            .map(|r| Box::new(r) as Box<dyn FormatReader>),
        Some(other) => {
            let mut detection_hint = Hint::new();
            detection_hint.with_extension(other);
            detect_container(&detection_hint, mss)
        }
        None => detect_container(&Hint::new(), mss),
    };

    reader.map_err(|e| AudioCodecError::DecodingFailed(format!("container: {}", e)))
}

fn detect_container(
    hint: &Hint,
    mss: MediaSourceStream,
) -> symphonia::core::errors::Result<Box<dyn FormatReader>> {
    symphonia::default::get_probe()
        .format(hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map(|detected| detected.format)
}

/// Reads a mono 16-bit WAV into normalized f32 samples.
pub fn read_canonical_samples(path: &Path) -> Result<Vec<f32>, AudioCodecError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| AudioCodecError::DecodingFailed(format!("wav header: {}", e)))?;
    let spec = reader.spec();

    let channels = spec.channels.max(1) as usize;
    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect::<Result<_, _>>(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32))
            .collect::<Result<_, _>>(),
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<_, _>>(),
        (format, bits) => {
            return Err(AudioCodecError::DecodingFailed(format!(
                "unsupported wav sample format: {:?} {} bits",
                format, bits
            )));
        }
    }
    .map_err(|e| AudioCodecError::DecodingFailed(format!("wav samples: {}", e)))?;

    let mono = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        interleaved
    };

    if spec.sample_rate != CANONICAL_SAMPLE_RATE {
        return resample(&mono, spec.sample_rate, CANONICAL_SAMPLE_RATE);
    }

    Ok(mono)
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioCodecError> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| AudioCodecError::EncodingFailed(format!("resampler init: {}", e)))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let mut input = chunk.to_vec();
        input.resize(chunk_size, 0.0);

        let result = resampler
            .process(&[input], None)
            .map_err(|e| AudioCodecError::EncodingFailed(format!("resample: {}", e)))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // Padding of the last chunk adds a tail of silence.
    let expected_len = (samples.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}
