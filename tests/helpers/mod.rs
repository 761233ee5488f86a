use std::f32::consts::PI;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dictum::application::ports::{
    AudioConverter, ConversionError, RawSegment, TranscriptionEngine, TranscriptionError,
    TranscriptionOutput, TranscriptionRequest,
};
use dictum::application::services::{AudioNormalizer, EngineSlot, TranscriptionService};
use dictum::domain::{CanonicalAudio, NormalizationTier};
use dictum::infrastructure::audio::{SymphoniaCodec, TranscriptionProvider};
use dictum::presentation::{AppState, ModelInfo, create_router};

pub const TEST_MODEL_NAME: &str = "mock-whisper";
pub const MULTIPART_BOUNDARY: &str = "dictum-test-boundary";

/// 16-bit PCM WAV with a 440 Hz tone on every channel.
pub fn build_wav(sample_rate: u32, channels: u16, duration: Duration) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (sample_rate as f64 * duration.as_secs_f64()) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = ((t * 440.0 * 2.0 * PI).sin() * 0.3 * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Opus silence frame: CELT fullband, 20 ms, mono.
const OPUS_SILENT_FRAME: [u8; 3] = [0xF8, 0xFF, 0xFE];
pub const OPUS_PRE_SKIP: usize = 312;
pub const OPUS_FRAME_SAMPLES: usize = 960;

/// WebM with one mono Opus track, the layout browser recorders produce.
/// Every block carries the 20 ms silence frame so no encoder is needed.
pub fn build_webm_opus(duration: Duration) -> Vec<u8> {
    let packets = (duration.as_millis() / 20) as usize;

    let mut opus_head = b"OpusHead".to_vec();
    opus_head.extend_from_slice(&[1, 1]);
    opus_head.extend_from_slice(&(OPUS_PRE_SKIP as u16).to_le_bytes());
    opus_head.extend_from_slice(&48_000u32.to_le_bytes());
    opus_head.extend_from_slice(&[0, 0, 0]);

    let ebml_header = ebml_element(
        0x1A45_DFA3,
        &[ebml_uint(0x4286, 1), ebml_element(0x4282, b"webm")].concat(),
    );
    let info = ebml_element(0x1549_A966, &ebml_uint(0x2A_D7B1, 1_000_000));
    let audio = ebml_element(
        0xE1,
        &[
            ebml_element(0xB5, &48_000f64.to_be_bytes()),
            ebml_uint(0x9F, 1),
        ]
        .concat(),
    );
    let track_entry = ebml_element(
        0xAE,
        &[
            ebml_uint(0xD7, 1),
            ebml_uint(0x73C5, 1),
            ebml_uint(0x83, 2),
            ebml_element(0x86, b"A_OPUS"),
            ebml_element(0x63A2, &opus_head),
            audio,
        ]
        .concat(),
    );
    let tracks = ebml_element(0x1654_AE6B, &track_entry);

    let mut cluster = ebml_uint(0xE7, 0);
    for i in 0..packets {
        // track 1, block timestamp in ms, keyframe without lacing
        let mut block = vec![0x81];
        block.extend_from_slice(&((i * 20) as i16).to_be_bytes());
        block.push(0x80);
        block.extend_from_slice(&OPUS_SILENT_FRAME);
        cluster.extend(ebml_element(0xA3, &block));
    }
    let cluster = ebml_element(0x1F43_B675, &cluster);

    let segment = ebml_element(0x1853_8067, &[info, tracks, cluster].concat());
    [ebml_header, segment].concat()
}

fn ebml_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let id_bytes = id.to_be_bytes();
    let first = id_bytes.iter().position(|b| *b != 0).unwrap_or(3);

    let mut element = id_bytes[first..].to_vec();
    // 8-byte size vint
    element.push(0x01);
    element.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
    element.extend_from_slice(payload);
    element
}

fn ebml_uint(id: u32, value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(7);
    ebml_element(id, &bytes[first..])
}

/// Bytes no decoder recognizes, long enough to pass upload validation.
pub fn garbage_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 7) as u8 ^ 0xA5).collect()
}

pub fn raw_segment(start: f64, end: f64, text: &str) -> RawSegment {
    RawSegment {
        start,
        end,
        text: text.to_string(),
    }
}

/// Engine that fails a configurable number of times, then replays fixed
/// segments. Records every request and the tier of the audio it was given.
pub struct MockEngine {
    segments: Vec<RawSegment>,
    language: Option<String>,
    failures: usize,
    calls: AtomicUsize,
    requests: Mutex<Vec<TranscriptionRequest>>,
    tiers: Mutex<Vec<NormalizationTier>>,
}

impl MockEngine {
    pub fn new(segments: Vec<RawSegment>, language: Option<&str>) -> Self {
        Self {
            segments,
            language: language.map(String::from),
            failures: 0,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            tiers: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new(), None).failing_first(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TranscriptionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn tiers(&self) -> Vec<NormalizationTier> {
        self.tiers.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionEngine for MockEngine {
    async fn transcribe(
        &self,
        audio: &CanonicalAudio,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutput, TranscriptionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.tiers.lock().unwrap().push(audio.tier());

        if call < self.failures {
            return Err(TranscriptionError::TranscriptionFailed(
                "mock failure".to_string(),
            ));
        }

        Ok(TranscriptionOutput::new(
            Box::new(self.segments.clone().into_iter()),
            self.language.clone(),
        ))
    }

    fn model_name(&self) -> &str {
        TEST_MODEL_NAME
    }
}

pub enum ConverterBehavior {
    Fail,
    Write(Vec<u8>),
}

/// Stand-in for ffmpeg that either fails or writes fixed bytes.
pub struct MockConverter {
    behavior: ConverterBehavior,
    calls: AtomicUsize,
}

impl MockConverter {
    pub fn failing() -> Self {
        Self {
            behavior: ConverterBehavior::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn writing(bytes: Vec<u8>) -> Self {
        Self {
            behavior: ConverterBehavior::Write(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AudioConverter for MockConverter {
    fn convert_to_canonical(
        &self,
        _source: &Path,
        destination: &Path,
    ) -> Result<(), ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ConverterBehavior::Fail => Err(ConversionError::ToolFailed {
                status: "exit status: 1".to_string(),
                stderr: "mock converter failure".to_string(),
            }),
            ConverterBehavior::Write(bytes) => {
                std::fs::write(destination, bytes)?;
                Ok(())
            }
        }
    }
}

/// Hand-built `multipart/form-data` body.
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self { body: Vec::new() }
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                MULTIPART_BOUNDARY, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
        self.body
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY)
    }
}

pub fn build_service(
    engine: EngineSlot,
    converter: Arc<dyn AudioConverter>,
    scratch_dir: &Path,
) -> TranscriptionService {
    let normalizer = Arc::new(AudioNormalizer::new(Arc::new(SymphoniaCodec), converter));
    TranscriptionService::new(engine, normalizer, scratch_dir.to_path_buf())
}

pub fn create_test_app(
    engine: EngineSlot,
    converter: Arc<dyn AudioConverter>,
    scratch_dir: &Path,
) -> axum::Router {
    let state = AppState {
        transcription_service: Arc::new(build_service(engine, converter, scratch_dir)),
        model: ModelInfo {
            name: TEST_MODEL_NAME.to_string(),
            provider: TranscriptionProvider::Local,
        },
        max_upload_bytes: 25 * 1024 * 1024,
    };
    create_router(state)
}

pub fn scratch_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
