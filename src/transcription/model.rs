//! # Whisper Model Management
//!
//! Handles downloading and running Whisper models with Candle. Model files
//! come from HuggingFace (cached locally by hf-hub); inference runs on
//! whatever device the startup sequence selected.
//!
//! ## Spoken-language handling:
//! No language hint is supplied to the decoder. After encoding the audio we
//! let the model predict its own language token, which is how Whisper
//! auto-detects the spoken language.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Standard multilingual Whisper special-token ids.
const SOT_TOKEN: u32 = 50258;
const EOT_TOKEN: u32 = 50257;
const TRANSCRIBE_TOKEN: u32 = 50359;
const NO_TIMESTAMPS_TOKEN: u32 = 50363;

/// Language tokens occupy a contiguous id range right after SOT.
const FIRST_LANGUAGE_TOKEN: u32 = 50259;
const LANGUAGE_TOKEN_COUNT: u32 = 99;

/// Decoding stops after this many generated tokens even without EOT.
const MAX_DECODE_TOKENS: usize = 224;

/// Whisper expects 16kHz mono input, padded or truncated to 30 seconds.
pub const SAMPLE_RATE: usize = 16_000;
const CHUNK_SECONDS: usize = 30;
const MEL_FRAMES: usize = 3000;

/// Available Whisper model sizes.
///
/// ## Trade-offs:
/// Larger models are more accurate but slower and hungrier for memory.
/// The default ("tiny") keeps startup fast on CPU-only machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// The HuggingFace model repository for this size.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }

    /// Approximate on-disk model size in MB, for health reporting.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelSize::Tiny => 39,
            ModelSize::Base => 74,
            ModelSize::Small => 244,
            ModelSize::Medium => 769,
            ModelSize::Large => 1550,
        }
    }
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// A loaded Whisper model ready for transcription.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
    size: ModelSize,
}

impl WhisperModel {
    /// Download (or reuse from cache) and load a Whisper model.
    ///
    /// ## Loading Process:
    /// 1. Create a HuggingFace API client (honoring HF_TOKEN / HF_HUB_CACHE)
    /// 2. Fetch config.json, tokenizer.json and the safetensors weights
    /// 3. Build the model on the target device
    pub async fn load(size: ModelSize, device: Device) -> Result<Self> {
        info!("Loading Whisper {} model...", size);
        let start_time = std::time::Instant::now();

        let api = {
            use hf_hub::api::tokio::ApiBuilder;
            let mut builder = ApiBuilder::new().with_progress(false);
            if let Ok(token) = std::env::var("HF_TOKEN") {
                builder = builder.with_token(Some(token));
            }
            if let Ok(cache_dir) = std::env::var("HF_HUB_CACHE") {
                builder = builder.with_cache_dir(cache_dir.into());
            }
            builder
                .build()
                .map_err(|e| anyhow!("Failed to create HuggingFace API client: {}", e))?
        };

        let repo = api.model(size.repo_name().to_string());
        let config_filename = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("Failed to download config.json from {}: {}", size.repo_name(), e))?;
        let tokenizer_filename = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| anyhow!("Failed to download tokenizer.json from {}: {}", size.repo_name(), e))?;
        let model_filename = repo
            .get("model.safetensors")
            .await
            .map_err(|e| anyhow!("Failed to download model weights from {}: {}", size.repo_name(), e))?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_filename)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        let mel_filters = mel_filter_bank(400, config.num_mel_bins as usize);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[model_filename], m::DTYPE, &device)?
        };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        info!(
            "Whisper {} model loaded in {:.2}s",
            size,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Self {
            model,
            config,
            device,
            tokenizer,
            mel_filters,
            size,
        })
    }

    /// Transcribe 16kHz mono audio samples to text.
    ///
    /// ## Process:
    /// 1. Convert PCM to a log-mel spectrogram and run the encoder
    /// 2. Let the decoder predict the spoken-language token (auto-detect)
    /// 3. Greedy-decode text tokens until EOT, a repetition trips the
    ///    guard, or the token cap is reached
    pub fn transcribe(&mut self, samples: &[f32]) -> Result<String> {
        if samples.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        let mel = self.log_mel_spectrogram(samples)?.unsqueeze(0)?;
        let features = self.model.encoder.forward(&mel, true)?;

        let language_token = self.predict_language_token(&features)?;
        debug!(language_token, "Decoder predicted spoken-language token");

        let mut tokens = vec![
            SOT_TOKEN,
            language_token,
            TRANSCRIBE_TOKEN,
            NO_TIMESTAMPS_TOKEN,
        ];
        let prefix_len = tokens.len();

        for _ in 0..MAX_DECODE_TOKENS {
            let input = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
            let hidden = self.model.decoder.forward(&input, &features, true)?;
            let last = hidden.i((.., tokens.len() - 1.., ..))?;
            let logits = self.model.decoder.final_linear(&last)?;
            let row: Vec<f32> = logits.i((0, 0, ..))?.to_vec1()?;

            let next = argmax(&row);
            if next == EOT_TOKEN {
                break;
            }
            if is_repetitive(&tokens[prefix_len..], next) {
                break;
            }
            tokens.push(next);
        }

        let text = self
            .tokenizer
            .decode(&tokens[prefix_len..], true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))?;

        Ok(text.trim().to_string())
    }

    /// Predict which language is being spoken from the encoded audio.
    ///
    /// One decoder step after SOT, restricted to the language-token id range.
    fn predict_language_token(&mut self, features: &Tensor) -> Result<u32> {
        let input = Tensor::new(&[SOT_TOKEN], &self.device)?.unsqueeze(0)?;
        let hidden = self.model.decoder.forward(&input, features, true)?;
        let logits = self.model.decoder.final_linear(&hidden)?;
        let row: Vec<f32> = logits.i((0, 0, ..))?.to_vec1()?;

        let start = FIRST_LANGUAGE_TOKEN as usize;
        let end = (start + LANGUAGE_TOKEN_COUNT as usize).min(row.len());
        if start >= row.len() {
            return Err(anyhow!("Logit row too short for language tokens"));
        }

        let offset = argmax(&row[start..end]);
        Ok(FIRST_LANGUAGE_TOKEN + offset)
    }

    /// Convert PCM audio to the log-mel tensor the encoder expects.
    ///
    /// Pads or truncates to the 30-second chunk Whisper was trained on.
    fn log_mel_spectrogram(&self, samples: &[f32]) -> Result<Tensor> {
        let target_len = CHUNK_SECONDS * SAMPLE_RATE;
        let mut padded = vec![0.0f32; target_len];
        let copy_len = samples.len().min(target_len);
        padded[..copy_len].copy_from_slice(&samples[..copy_len]);

        let n_mels = self.config.num_mel_bins as usize;
        let frame_size = padded.len() / MEL_FRAMES;
        let n_fft = 400;
        let mut mel = vec![0.0f32; n_mels * MEL_FRAMES];

        for frame in 0..MEL_FRAMES {
            let start = frame * frame_size;
            let end = (start + frame_size).min(padded.len());

            for bin in 0..n_mels {
                let mut energy = 0.0f32;
                for &sample in &padded[start..end] {
                    // Weight each bin by its triangular filter response
                    energy += sample.abs() * self.mel_filters[bin * n_fft + (frame % n_fft)];
                }
                // Log scaling with a -80 dB floor
                mel[bin * MEL_FRAMES + frame] =
                    (energy / frame_size as f32).max(1e-10).ln().max(-11.5129);
            }
        }

        Ok(Tensor::from_vec(mel, (n_mels, MEL_FRAMES), &self.device)?)
    }

    /// The size this model was loaded as.
    pub fn size(&self) -> ModelSize {
        self.size
    }
}

/// Triangular mel filter bank, generated programmatically.
fn mel_filter_bank(n_fft: usize, n_mels: usize) -> Vec<f32> {
    let mut filters = vec![0.0f32; n_fft * n_mels];

    for i in 0..n_mels {
        let center = (i + 1) * n_fft / (n_mels + 1);
        let width = n_fft / (n_mels + 1);

        for j in 0..n_fft {
            if j >= center.saturating_sub(width) && j <= center + width {
                let distance = (j as i32 - center as i32).abs() as f32;
                filters[i * n_fft + j] = (1.0 - distance / width as f32).max(0.0);
            }
        }
    }

    filters
}

/// Index of the largest value in a logit slice.
fn argmax(row: &[f32]) -> u32 {
    let mut best = 0usize;
    for (i, &value) in row.iter().enumerate() {
        if value > row[best] {
            best = i;
        }
    }
    best as u32
}

/// Detect degenerate decoder loops (same token or same trigram repeating).
fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
    if tokens.len() >= 3 && tokens[tokens.len() - 3..] == [new_token, new_token, new_token] {
        return true;
    }

    if tokens.len() >= 6 {
        let last_3 = &tokens[tokens.len() - 3..];
        let prev_3 = &tokens[tokens.len() - 6..tokens.len() - 3];
        if last_3 == prev_3 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("invalid".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_model_size_metadata() {
        assert_eq!(ModelSize::Tiny.repo_name(), "openai/whisper-tiny");
        assert_eq!(ModelSize::Medium.size_mb(), 769);
        assert_eq!(ModelSize::Base.to_string(), "base");
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.9, 0.3]), 1);
        assert_eq!(argmax(&[5.0]), 0);
    }

    #[test]
    fn test_repetition_guard() {
        // Immediate triple repeat
        assert!(is_repetitive(&[7, 7, 7], 7));
        // Repeating trigram
        assert!(is_repetitive(&[1, 2, 3, 1, 2, 3], 9));
        // Healthy sequence
        assert!(!is_repetitive(&[1, 2, 3, 4, 5], 6));
        // Too short to judge
        assert!(!is_repetitive(&[1, 2], 1));
    }

    #[test]
    fn test_mel_filter_bank_shape() {
        let filters = mel_filter_bank(400, 80);
        assert_eq!(filters.len(), 400 * 80);
        // Filters are normalized triangles, never negative
        assert!(filters.iter().all(|&f| (0.0..=1.0).contains(&f)));
    }
}
