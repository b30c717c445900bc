//! # Generative Text API Integration
//!
//! Single-turn, stateless calls to an OpenAI-compatible chat-completions API.
//! Every pipeline stage that needs generated text (translation, summary,
//! quiz) goes through the [`TextCompleter`] trait so tests can substitute a
//! mock collaborator instead of a live network client.

pub mod client;

pub use client::ChatClient;

use crate::error::AppError;
use async_trait::async_trait;

/// A single-turn text completion collaborator.
///
/// ## Contract:
/// `complete(prompt, max_tokens)` sends exactly one user message with no
/// conversation history and returns the trimmed response text. `max_tokens`
/// is the generation budget for that one call.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError>;
}
