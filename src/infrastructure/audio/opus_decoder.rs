use std::sync::{Mutex, OnceLock};

use audiopus::coder::{Decoder as LibOpus, GenericCtl};
use audiopus::packet::Packet as OpusPacket;
use audiopus::{Channels as OpusChannels, MutSignals, SampleRate};
use symphonia::core::audio::{AsAudioBufferRef, AudioBuffer, AudioBufferRef, Layout, Signal, SignalSpec};
use symphonia::core::codecs::{
    CODEC_TYPE_OPUS, CodecDescriptor, CodecParameters, CodecRegistry, Decoder, DecoderOptions,
    FinalizeResult,
};
use symphonia::core::errors::{Error, Result, unsupported_error};
use symphonia::core::formats::Packet;

const OPUS_SAMPLE_RATE: u32 = 48_000;

/// 120 ms at 48 kHz, the longest packet Opus allows.
const MAX_PACKET_FRAMES: usize = 5_760;

/// Every codec symphonia ships plus libopus, which browsers use inside
/// webm and ogg recordings.
pub fn codec_registry() -> &'static CodecRegistry {
    static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        symphonia::default::register_enabled_codecs(&mut registry);
        registry.register_all::<OpusDecoder>();
        registry
    })
}

/// The fields of an `OpusHead` identification header the decoder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpusHead {
    channels: usize,
    pre_skip: usize,
}

impl OpusHead {
    fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 19 || &bytes[..8] != b"OpusHead" {
            return None;
        }
        Some(Self {
            channels: bytes[9] as usize,
            pre_skip: u16::from_le_bytes([bytes[10], bytes[11]]) as usize,
        })
    }
}

/// Symphonia decoder backed by libopus. Mono and stereo streams only.
pub struct OpusDecoder {
    // libopus state is Send but not Sync; decode takes `&mut self` so the
    // lock is never contended.
    inner: Mutex<LibOpus>,
    params: CodecParameters,
    channels: usize,
    pre_skip: usize,
    pending_skip: usize,
    interleaved: Vec<f32>,
    buf: AudioBuffer<f32>,
}

impl Decoder for OpusDecoder {
    fn try_new(params: &CodecParameters, _options: &DecoderOptions) -> Result<Self> {
        let head = params.extra_data.as_deref().and_then(OpusHead::parse);

        let channels = head
            .map(|h| h.channels)
            .or_else(|| params.channels.map(|c| c.count()))
            .or_else(|| params.channel_layout.map(|l| l.into_channels().count()))
            .unwrap_or(1);

        let (opus_channels, layout) = match channels {
            1 => (OpusChannels::Mono, Layout::Mono),
            2 => (OpusChannels::Stereo, Layout::Stereo),
            _ => return unsupported_error("opus: only mono and stereo streams are supported"),
        };

        let decoder = LibOpus::new(SampleRate::Hz48000, opus_channels).map_err(|e| {
            tracing::debug!(error = %e, "libopus decoder creation failed");
            Error::DecodeError("opus: decoder creation failed")
        })?;

        let pre_skip = head.map(|h| h.pre_skip).unwrap_or(0);

        Ok(Self {
            inner: Mutex::new(decoder),
            params: params.clone(),
            channels,
            pre_skip,
            pending_skip: pre_skip,
            interleaved: vec![0.0; MAX_PACKET_FRAMES * channels],
            buf: AudioBuffer::new(
                MAX_PACKET_FRAMES as u64,
                SignalSpec::new_with_layout(OPUS_SAMPLE_RATE, layout),
            ),
        })
    }

    fn supported_codecs() -> &'static [CodecDescriptor] {
        &[CodecDescriptor {
            codec: CODEC_TYPE_OPUS,
            short_name: "opus",
            long_name: "Opus (libopus)",
            inst_func: |params, options| Ok(Box::new(Self::try_new(params, options)?)),
        }]
    }

    fn reset(&mut self) {
        self.pending_skip = self.pre_skip;
        if let Ok(decoder) = self.inner.get_mut() {
            if let Err(e) = decoder.reset_state() {
                tracing::debug!(error = %e, "libopus reset failed");
            }
        }
    }

    fn codec_params(&self) -> &CodecParameters {
        &self.params
    }

    fn decode(&mut self, packet: &Packet) -> Result<AudioBufferRef<'_>> {
        self.buf.clear();

        let input = OpusPacket::try_from(packet.buf())
            .map_err(|_| Error::DecodeError("opus: empty packet"))?;
        let output = MutSignals::try_from(&mut self.interleaved[..])
            .map_err(|_| Error::DecodeError("opus: output buffer rejected"))?;

        let decoder = self
            .inner
            .get_mut()
            .map_err(|_| Error::DecodeError("opus: decoder state poisoned"))?;
        let frames = decoder.decode_float(Some(input), output, false).map_err(|e| {
            tracing::debug!(error = %e, "libopus rejected packet");
            Error::DecodeError("opus: corrupt packet")
        })?;

        self.buf.render_reserved(Some(frames));
        for channel in 0..self.channels {
            let plane = self.buf.chan_mut(channel);
            for (frame, sample) in plane.iter_mut().enumerate() {
                *sample = self.interleaved[frame * self.channels + channel];
            }
        }

        if self.pending_skip > 0 {
            let skip = self.pending_skip.min(frames);
            self.buf.shift(skip);
            self.pending_skip -= skip;
        }

        Ok(self.buf.as_audio_buffer_ref())
    }

    fn finalize(&mut self) -> FinalizeResult {
        FinalizeResult::default()
    }

    fn last_decoded(&self) -> AudioBufferRef<'_> {
        self.buf.as_audio_buffer_ref()
    }
}
