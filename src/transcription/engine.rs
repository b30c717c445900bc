//! # Transcription Engine
//!
//! Process-wide wrapper around the loaded Whisper model. The engine is
//! constructed once at startup, loads the configured model, and then serves
//! every upload with one blocking inference call.

use crate::transcription::model::{ModelSize, WhisperModel, SAMPLE_RATE};
use anyhow::{anyhow, Result};
use candle_core::Device;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::info;

/// Result of a transcription operation, shaped for the API response.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub text: String,

    /// Duration of audio processed (seconds)
    pub audio_duration: f64,

    /// Time taken for transcription (milliseconds)
    pub processing_time_ms: u64,

    /// Model used for transcription
    pub model_name: String,

    /// Timestamp when transcription was completed
    pub timestamp: u64,
}

/// The transcription engine handlers call into.
///
/// ## Thread Safety:
/// The Whisper decoder mutates its internal key/value cache during
/// inference, so transcription takes the write lock. That serializes
/// concurrent uploads through the single loaded model, which matches the
/// one-blocking-call-per-action execution model of this service.
pub struct TranscriptionEngine {
    model: RwLock<Option<WhisperModel>>,
    device: Device,
}

impl TranscriptionEngine {
    pub fn new(device: Device) -> Self {
        Self {
            model: RwLock::new(None),
            device,
        }
    }

    /// Load the configured Whisper model. Called once at startup; a failure
    /// here is fatal for the process.
    pub async fn load_model(&self, size: ModelSize) -> Result<()> {
        info!("Loading {} model for transcription engine", size);
        let new_model = WhisperModel::load(size, self.device.clone()).await?;

        let mut model_guard = self.model.write().await;
        *model_guard = Some(new_model);
        Ok(())
    }

    /// Check if a model is currently loaded and ready.
    pub async fn is_model_loaded(&self) -> bool {
        self.model.read().await.is_some()
    }

    /// Size of the currently loaded model, for health reporting.
    pub async fn model_size(&self) -> Option<ModelSize> {
        self.model.read().await.as_ref().map(|model| model.size())
    }

    /// Name of the currently loaded model, for health reporting.
    pub async fn model_name(&self) -> Option<String> {
        self.model
            .read()
            .await
            .as_ref()
            .map(|model| model.size().to_string())
    }

    /// Transcribe 16kHz mono audio samples to text.
    ///
    /// No language hint is passed down; the model auto-detects the spoken
    /// language. Any model failure propagates as-is.
    pub async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        let start_time = Instant::now();

        if samples.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        let audio_duration = samples.len() as f64 / SAMPLE_RATE as f64;

        let (text, model_name) = {
            let mut model_guard = self.model.write().await;
            match model_guard.as_mut() {
                Some(model) => {
                    let text = model.transcribe(samples)?;
                    (text, model.size().to_string())
                }
                None => return Err(anyhow!("No model loaded for transcription")),
            }
        };

        let processing_time_ms = start_time.elapsed().as_millis() as u64;
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        info!(
            "Transcription completed: {:.2}s audio -> {} chars in {}ms",
            audio_duration,
            text.len(),
            processing_time_ms
        );

        Ok(TranscriptionResult {
            text,
            audio_duration,
            processing_time_ms,
            model_name,
            timestamp,
        })
    }
}
