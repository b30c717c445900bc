//! # Transcription Module
//!
//! Speech-to-text using Whisper models via the Candle framework — a pure
//! Rust implementation with no FFI bindings to whisper.cpp.
//!
//! ## Key Components:
//! - **Model Management**: Downloading and loading Whisper models from HuggingFace
//! - **Transcription Engine**: The process-wide engine handlers call into
//!
//! ## Pipeline role:
//! The engine is loaded once at startup with the configured model size and
//! reused read-only for every upload. No language hint is ever passed to the
//! model — it predicts the spoken language itself from the audio.

pub mod engine;
pub mod model;

pub use engine::{TranscriptionEngine, TranscriptionResult};
pub use model::ModelSize;
