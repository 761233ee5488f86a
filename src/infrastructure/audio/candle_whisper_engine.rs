use std::fmt::Display;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::application::ports::{
    DecodingOptions, RawSegment, TranscriptionEngine, TranscriptionError, TranscriptionOutput,
    TranscriptionRequest,
};
use crate::domain::{CANONICAL_SAMPLE_RATE, CanonicalAudio};

use super::symphonia_codec::read_canonical_samples;
use super::whisper_languages::{WHISPER_LANGUAGES, language_token};

// Defaults applied when the caller leaves an option unset.
const DEFAULT_BEAM_SIZE: usize = 5;
const DEFAULT_CONDITION_ON_PREVIOUS_TEXT: bool = true;
const MAX_NEW_TOKENS: usize = 224;
const SOT_PREV_TOKEN: &str = "<|startofprev|>";

/// Local Whisper inference on candle. One inference runs at a time.
pub struct CandleWhisperEngine {
    inner: Arc<WhisperInner>,
    model_id: String,
}

struct WhisperInner {
    model: Mutex<m::model::Whisper>,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    mel_filters: Vec<f32>,
    specials: SpecialTokens,
    language_tokens: Vec<(&'static str, u32)>,
}

struct SpecialTokens {
    sot: u32,
    sot_prev: Option<u32>,
    translate: u32,
    no_timestamps: u32,
    eot: u32,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedOptions {
    beam_size: usize,
    condition_on_previous_text: bool,
}

impl ResolvedOptions {
    fn from_options(options: &DecodingOptions) -> Self {
        Self {
            beam_size: options.beam_size.unwrap_or(DEFAULT_BEAM_SIZE).max(1),
            condition_on_previous_text: options
                .condition_on_previous_text
                .unwrap_or(DEFAULT_CONDITION_ON_PREVIOUS_TEXT),
        }
    }
}

#[derive(Debug, Clone)]
struct Hypothesis {
    tokens: Vec<u32>,
    logprob: f64,
    finished: bool,
}

impl CandleWhisperEngine {
    pub fn new(model_id: &str) -> Result<Self, TranscriptionError> {
        let device = Device::Cpu;

        tracing::info!(
            device = ?device,
            model = model_id,
            "Initializing Candle Whisper transcription engine"
        );

        let api = Api::new().map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("config.json: {}", e)))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("tokenizer.json: {}", e)))?;
        let weights_path = repo.get("model.safetensors").map_err(|e| {
            TranscriptionError::ModelLoadFailed(format!("model.safetensors: {}", e))
        })?;

        let config_contents = std::fs::read_to_string(&config_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("read config: {}", e)))?;
        let config: Config = serde_json::from_str(&config_contents)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("parse config: {}", e)))?;

        let mel_bytes_path = fetch_mel_filters(&api, &config)?;
        let mel_bytes = std::fs::read(&mel_bytes_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("mel filters: {}", e)))?;
        let mel_filters = read_mel_filters(&mel_bytes, config.num_mel_bins)?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("tokenizer: {}", e)))?;
        let specials = SpecialTokens::from_tokenizer(&tokenizer)?;
        let language_tokens: Vec<(&'static str, u32)> = WHISPER_LANGUAGES
            .iter()
            .filter_map(|code| {
                tokenizer
                    .token_to_id(&language_token(code))
                    .map(|id| (*code, id))
            })
            .collect();

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("weights: {}", e)))?
        };

        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("model: {}", e)))?;

        tracing::info!(
            languages = language_tokens.len(),
            "Candle Whisper engine loaded successfully"
        );

        Ok(Self {
            inner: Arc::new(WhisperInner {
                model: Mutex::new(model),
                tokenizer,
                config,
                device,
                mel_filters,
                specials,
                language_tokens,
            }),
            model_id: model_id.to_string(),
        })
    }
}

#[async_trait]
impl TranscriptionEngine for CandleWhisperEngine {
    async fn transcribe(
        &self,
        audio: &CanonicalAudio,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutput, TranscriptionError> {
        let inner = Arc::clone(&self.inner);
        let path = audio.path().to_path_buf();
        let request = request.clone();

        tokio::task::spawn_blocking(move || inner.run(path, &request))
            .await
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("worker: {}", e)))?
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

impl WhisperInner {
    fn run(
        &self,
        path: PathBuf,
        request: &TranscriptionRequest,
    ) -> Result<TranscriptionOutput, TranscriptionError> {
        let pcm = read_canonical_samples(&path)
            .map_err(|e| TranscriptionError::InvalidAudio(e.to_string()))?;
        if pcm.is_empty() {
            return Err(TranscriptionError::InvalidAudio(
                "no samples in canonical audio".to_string(),
            ));
        }

        let options = ResolvedOptions::from_options(&request.options);
        if request.options.word_timestamps == Some(true) {
            tracing::debug!("Word timestamps are not produced by the local engine");
        }

        let explicit_language = match request.language.code() {
            Some(code) => Some(self.language_id(code)?),
            None => None,
        };

        let mel_windows = self.mel_windows(&pcm)?;
        let total_secs = pcm.len() as f64 / CANONICAL_SAMPLE_RATE as f64;
        let window_secs = m::N_SAMPLES as f64 / CANONICAL_SAMPLE_RATE as f64;

        let mut model = self.model.lock().map_err(|_| {
            TranscriptionError::TranscriptionFailed("whisper model lock poisoned".to_string())
        })?;

        let mut language = explicit_language;
        let mut previous_tokens: Vec<u32> = Vec::new();
        let mut segments = Vec::new();

        for (i, mel) in mel_windows.iter().enumerate() {
            let features = model.encoder.forward(mel, true).map_err(failed("encoder"))?;

            let (code, language_id) = match language {
                Some(found) => found,
                None => {
                    let detected = self.detect_language(&mut model, &features)?;
                    tracing::info!(language = detected.0, "Detected spoken language");
                    language = Some(detected);
                    detected
                }
            };

            let prompt = build_prompt(
                &self.specials,
                self.config.max_target_positions,
                language_id,
                options
                    .condition_on_previous_text
                    .then_some(previous_tokens.as_slice()),
            );

            tracing::debug!(
                window = i,
                language = code,
                beam_size = options.beam_size,
                "Decoding audio window"
            );
            let tokens = self.beam_search(&mut model, &features, &prompt, options.beam_size)?;
            model.reset_kv_cache();

            let text = self
                .tokenizer
                .decode(&tokens, true)
                .map_err(failed("detokenize"))?;

            previous_tokens = tokens;

            if text.trim().is_empty() {
                continue;
            }

            let start = i as f64 * window_secs;
            segments.push(RawSegment {
                start,
                end: (start + window_secs).min(total_secs),
                text,
            });
        }

        tracing::info!(
            segments = segments.len(),
            "Audio transcription completed"
        );

        Ok(TranscriptionOutput::new(
            Box::new(segments.into_iter()),
            language.map(|(code, _)| code.to_string()),
        ))
    }

    fn language_id(&self, code: &str) -> Result<(&'static str, u32), TranscriptionError> {
        self.language_tokens
            .iter()
            .find(|(known, _)| *known == code)
            .copied()
            .ok_or_else(|| TranscriptionError::UnsupportedLanguage(code.to_string()))
    }

    fn mel_windows(&self, pcm: &[f32]) -> Result<Vec<Tensor>, TranscriptionError> {
        let chunk_samples = m::N_SAMPLES;
        let n_mel = self.config.num_mel_bins;

        pcm.chunks(chunk_samples)
            .map(|chunk| {
                let mut samples = chunk.to_vec();
                samples.resize(chunk_samples, 0.0);

                let mel_data = m::audio::pcm_to_mel(&self.config, &samples, &self.mel_filters);
                let n_frames = mel_data.len() / n_mel;

                Tensor::from_vec(mel_data, (1, n_mel, n_frames), &self.device)
                    .map_err(failed("mel tensor"))
            })
            .collect()
    }

    fn detect_language(
        &self,
        model: &mut m::model::Whisper,
        features: &Tensor,
    ) -> Result<(&'static str, u32), TranscriptionError> {
        let logits = self.last_logits(model, features, &[self.specials.sot], true)?;
        model.reset_kv_cache();
        let logits = logits.to_vec1::<f32>().map_err(failed("language logits"))?;

        self.language_tokens
            .iter()
            .filter(|(_, id)| (*id as usize) < logits.len())
            .max_by(|(_, a), (_, b)| logits[*a as usize].total_cmp(&logits[*b as usize]))
            .copied()
            .ok_or_else(|| {
                TranscriptionError::TranscriptionFailed("no language tokens available".to_string())
            })
    }

    /// Beam search without timestamps. A width of one is greedy decoding.
    fn beam_search(
        &self,
        model: &mut m::model::Whisper,
        features: &Tensor,
        prompt: &[u32],
        beam_size: usize,
    ) -> Result<Vec<u32>, TranscriptionError> {
        let max_len = self
            .config
            .max_target_positions
            .min(prompt.len() + MAX_NEW_TOKENS);

        let mut beams = vec![Hypothesis {
            tokens: prompt.to_vec(),
            logprob: 0.0,
            finished: false,
        }];
        let mut flush = true;

        while beams.iter().any(|b| !b.finished) {
            let mut candidates = Vec::with_capacity(beams.len() * beam_size);

            for beam in &beams {
                if beam.finished {
                    candidates.push(beam.clone());
                    continue;
                }

                let logits = self.last_logits(model, features, &beam.tokens, flush)?;
                flush = false;
                let logprobs = candle_nn::ops::log_softmax(&logits, 0)
                    .and_then(|t| t.to_vec1::<f32>())
                    .map_err(failed("log_softmax"))?;

                for (token, logprob) in rank_tokens(
                    &logprobs,
                    self.specials.no_timestamps,
                    &self.config.suppress_tokens,
                    beam_size,
                ) {
                    let mut tokens = beam.tokens.clone();
                    let finished = token == self.specials.eot;
                    if !finished {
                        tokens.push(token);
                    }
                    let finished = finished || tokens.len() >= max_len;
                    candidates.push(Hypothesis {
                        tokens,
                        logprob: beam.logprob + logprob as f64,
                        finished,
                    });
                }
            }

            candidates.sort_by(|a, b| b.logprob.total_cmp(&a.logprob));
            candidates.truncate(beam_size);
            beams = candidates;
        }

        let score = |h: &Hypothesis| h.logprob / (h.tokens.len() - prompt.len()).max(1) as f64;
        let best = beams
            .into_iter()
            .max_by(|a, b| score(a).total_cmp(&score(b)))
            .ok_or_else(|| TranscriptionError::TranscriptionFailed("empty beam".to_string()))?;

        Ok(best.tokens[prompt.len()..].to_vec())
    }

    fn last_logits(
        &self,
        model: &mut m::model::Whisper,
        features: &Tensor,
        tokens: &[u32],
        flush: bool,
    ) -> Result<Tensor, TranscriptionError> {
        let token_tensor = Tensor::new(tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(failed("token tensor"))?;

        let decoder_output = model
            .decoder
            .forward(&token_tensor, features, flush)
            .map_err(failed("decoder"))?;

        let logits = decoder_output
            .squeeze(0)
            .and_then(|t| model.decoder.final_linear(&t))
            .map_err(failed("linear"))?;

        let seq_len = logits.dim(0).map_err(failed("logits"))?;
        logits.get(seq_len - 1).map_err(failed("logits"))
    }
}

impl SpecialTokens {
    fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self, TranscriptionError> {
        Ok(Self {
            sot: token_id(tokenizer, m::SOT_TOKEN)?,
            sot_prev: tokenizer.token_to_id(SOT_PREV_TOKEN),
            translate: token_id(tokenizer, m::TRANSLATE_TOKEN)?,
            no_timestamps: token_id(tokenizer, m::NO_TIMESTAMPS_TOKEN)?,
            eot: token_id(tokenizer, m::EOT_TOKEN)?,
        })
    }
}

/// Decoder prompt for one window: the previous window's text behind
/// `<|startofprev|>` (at most half the context), then
/// `<|startoftranscript|>`, the language, `<|translate|>` and
/// `<|notimestamps|>`.
fn build_prompt(
    specials: &SpecialTokens,
    max_target_positions: usize,
    language: u32,
    previous: Option<&[u32]>,
) -> Vec<u32> {
    let mut tokens = Vec::new();

    if let (Some(sot_prev), Some(previous)) = (specials.sot_prev, previous) {
        if !previous.is_empty() {
            let keep = max_target_positions / 2 - 1;
            let start = previous.len().saturating_sub(keep);
            tokens.push(sot_prev);
            tokens.extend_from_slice(&previous[start..]);
        }
    }

    tokens.extend([
        specials.sot,
        language,
        specials.translate,
        specials.no_timestamps,
    ]);
    tokens
}

/// The `k` most likely text tokens, best first.
fn rank_tokens(
    logprobs: &[f32],
    no_timestamps: u32,
    suppress: &[u32],
    k: usize,
) -> Vec<(u32, f32)> {
    // Timestamp tokens follow <|notimestamps|> in the vocabulary.
    let first_timestamp = no_timestamps as usize + 1;

    let mut ranked: Vec<(u32, f32)> = logprobs
        .iter()
        .enumerate()
        .filter(|(id, _)| *id < first_timestamp)
        .filter(|(id, _)| !suppress.contains(&(*id as u32)))
        .map(|(id, lp)| (id as u32, *lp))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

fn failed<E: Display>(context: &'static str) -> impl Fn(E) -> TranscriptionError {
    move |e| TranscriptionError::TranscriptionFailed(format!("{}: {}", context, e))
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32, TranscriptionError> {
    tokenizer.token_to_id(token).ok_or_else(|| {
        TranscriptionError::ModelLoadFailed(format!("token not found: {}", token))
    })
}

fn fetch_mel_filters(api: &Api, config: &Config) -> Result<PathBuf, TranscriptionError> {
    let file = match config.num_mel_bins {
        128 => "melfilters128.bytes",
        _ => "melfilters.bytes",
    };
    let mel_repo = api.repo(Repo::new(
        "FL33TW00D-HF/whisper-base".to_string(),
        RepoType::Model,
    ));
    mel_repo
        .get(file)
        .map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", file, e)))
}

fn read_mel_filters(bytes: &[u8], num_mel_bins: usize) -> Result<Vec<f32>, TranscriptionError> {
    let expected_len = num_mel_bins * (m::N_FFT / 2 + 1);
    if bytes.len() < expected_len * 4 {
        return Err(TranscriptionError::ModelLoadFailed(format!(
            "mel filters file too small: {} bytes, expected at least {}",
            bytes.len(),
            expected_len * 4
        )));
    }

    let filters: Vec<f32> = bytes
        .chunks_exact(4)
        .take(expected_len)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(filters)
}
