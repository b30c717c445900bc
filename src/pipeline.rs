//! # Pipeline Stages
//!
//! The three text-processing stages of the product: translation (a helper),
//! summarization, and quiz generation. Transcription lives in its own module
//! because it drives a local model instead of the remote API.
//!
//! ## Control flow:
//! Each stage is a plain async function over the injected [`TextCompleter`].
//! There is no chaining here — the UI invokes each stage explicitly and
//! carries text between stages through its textboxes.
//!
//! ## The translate-then-summarize ordering:
//! Summaries must read naturally in the requested language even when the
//! audio was spoken in another one. Translating first and then summarizing
//! natively preserves more fidelity than summarizing and then translating
//! the summary (a second lossy pass over already-compressed text).

use crate::config::GenerationConfig;
use crate::error::AppError;
use crate::language::{self, Language};
use crate::llm::TextCompleter;
use crate::prompts;
use tracing::{debug, info};

/// Fixed sentinel returned by the transcription endpoint when no audio was
/// uploaded. The ASR model is never invoked in that case.
pub const NO_AUDIO_SENTINEL: &str = "No audio uploaded";

/// Result of the summarization stage, carrying enough metadata for the UI
/// to show what happened.
#[derive(Debug)]
pub struct SummaryOutcome {
    /// The localized summary text.
    pub summary: String,

    /// Two-letter code the detector assigned to the source text.
    pub detected_code: String,

    /// Whether the source text was translated before summarization.
    pub translated: bool,
}

/// Translate arbitrary text into the target language.
///
/// Pure delegation to the generative API — no local translation logic
/// exists. The budget defaults to 1000 output tokens via configuration so
/// the translation can reproduce the full input.
pub async fn translate_text(
    completer: &dyn TextCompleter,
    text: &str,
    target: Language,
    max_tokens: u32,
) -> Result<String, AppError> {
    let prompt = prompts::translation_prompt(text, target);
    debug!(target = %target, max_tokens, "Translating text");
    completer.complete(&prompt, max_tokens).await
}

/// Summarize text in the requested language.
///
/// ## Process:
/// 1. Detect the dominant language of the source text (two-letter code).
/// 2. If it differs from the target's registered code, translate first;
///    otherwise use the source text unmodified.
/// 3. Substitute the (possibly translated) text into the target language's
///    native summary template and request a summary.
///
/// Detection failure on degenerate input surfaces as a `ValidationError`;
/// there is no recovery path.
pub async fn summarize_text(
    completer: &dyn TextCompleter,
    text: &str,
    target: Language,
    generation: &GenerationConfig,
) -> Result<SummaryOutcome, AppError> {
    let detected_code = language::detect_code(text)?;
    let needs_translation = detected_code != target.code();

    info!(
        detected = %detected_code,
        target = %target.code(),
        translating = needs_translation,
        "Summarization language check"
    );

    let subject = if needs_translation {
        translate_text(completer, text, target, generation.translation_max_tokens).await?
    } else {
        text.to_string()
    };

    let prompt = prompts::render(prompts::summary_template(target), &subject);
    let summary = completer
        .complete(&prompt, generation.summary_max_tokens)
        .await?;

    Ok(SummaryOutcome {
        summary,
        detected_code,
        translated: needs_translation,
    })
}

/// Generate a multiple-choice quiz from a summary.
///
/// The per-language template asks for exactly 2 questions with 4 options
/// each; the API's output is trusted verbatim with no structural validation.
pub async fn generate_quiz(
    completer: &dyn TextCompleter,
    summary: &str,
    target: Language,
    generation: &GenerationConfig,
) -> Result<String, AppError> {
    let prompt = prompts::render(prompts::quiz_template(target), summary);
    debug!(target = %target, "Generating quiz");
    completer
        .complete(&prompt, generation.quiz_max_tokens)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Test double that records every prompt/budget pair it receives and
    /// replies with canned responses in order.
    struct RecordingCompleter {
        calls: Mutex<Vec<(String, u32)>>,
        responses: Mutex<Vec<String>>,
    }

    impl RecordingCompleter {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            }
        }

        fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextCompleter for RecordingCompleter {
        async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_tokens));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(AppError::Upstream("no canned response left".to_string()));
            }
            Ok(responses.remove(0))
        }
    }

    fn budgets() -> GenerationConfig {
        GenerationConfig {
            translation_max_tokens: 1000,
            summary_max_tokens: 500,
            quiz_max_tokens: 500,
        }
    }

    const ENGLISH_TEXT: &str =
        "Hello world, this is a short talk about the history of computing machines \
         and the people who built them.";

    const TURKISH_TEXT: &str =
        "Bugün hava çok güzel ve parkta yürüyüş yapmak istiyorum, belki arkadaşlarım da gelir.";

    #[tokio::test]
    async fn test_matching_language_skips_translation() {
        let completer = RecordingCompleter::new(vec!["kısa özet"]);
        let outcome = summarize_text(&completer, TURKISH_TEXT, Language::Turkish, &budgets())
            .await
            .unwrap();

        assert!(!outcome.translated);
        assert_eq!(outcome.detected_code, "tr");
        assert_eq!(outcome.summary, "kısa özet");

        // Exactly one API call, and the original text went into the prompt
        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains(TURKISH_TEXT));
        assert_eq!(calls[0].1, 500);
    }

    #[tokio::test]
    async fn test_mismatched_language_translates_first() {
        let completer = RecordingCompleter::new(vec!["çevrilmiş metin", "özet"]);
        let outcome = summarize_text(&completer, ENGLISH_TEXT, Language::Turkish, &budgets())
            .await
            .unwrap();

        assert!(outcome.translated);
        assert_eq!(outcome.detected_code, "en");
        assert_eq!(outcome.summary, "özet");

        let calls = completer.calls();
        assert_eq!(calls.len(), 2);

        // First call is the translation prompt with the 1000-token budget
        assert!(calls[0].0.contains("Translate the following text into Turkish"));
        assert!(calls[0].0.contains(ENGLISH_TEXT));
        assert_eq!(calls[0].1, 1000);

        // Second call carries the TRANSLATED text (not the original) inside
        // the Turkish summary template
        assert!(calls[1].0.contains("çevrilmiş metin"));
        assert!(!calls[1].0.contains(ENGLISH_TEXT));
        assert!(calls[1].0.starts_with("Lütfen"));
        assert_eq!(calls[1].1, 500);
    }

    #[tokio::test]
    async fn test_kurdish_target_always_translates() {
        // The detector cannot produce "ku", so Kurdish output always routes
        // through translation regardless of the source language.
        let completer = RecordingCompleter::new(vec!["wergera kurdî", "kurtkirin"]);
        let outcome = summarize_text(&completer, ENGLISH_TEXT, Language::Kurdish, &budgets())
            .await
            .unwrap();

        assert!(outcome.translated);
        assert_eq!(completer.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_summarize_empty_text_fails_detection() {
        let completer = RecordingCompleter::new(vec![]);
        let result = summarize_text(&completer, "", Language::English, &budgets()).await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        // Detection failed before any API call was made
        assert!(completer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quiz_uses_language_template_and_budget() {
        let completer = RecordingCompleter::new(vec!["1) soru..."]);
        let quiz = generate_quiz(&completer, "kısa özet", Language::Turkish, &budgets())
            .await
            .unwrap();

        assert_eq!(quiz, "1) soru...");
        let calls = completer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("2 adet çoktan seçmeli soru"));
        assert!(calls[0].0.contains("kısa özet"));
        assert!(!calls[0].0.contains(prompts::PLACEHOLDER));
        assert_eq!(calls[0].1, 500);
    }

    #[tokio::test]
    async fn test_round_trip_english_audio_to_turkish_quiz() {
        // Transcript -> Turkish summary -> Turkish quiz, end to end
        let completer = RecordingCompleter::new(vec![
            "Merhaba dünya, bu hesaplama makineleri hakkında kısa bir konuşma.",
            "Konuşma, bilgisayarların tarihini özetliyor.",
            "1) Soru bir? (a) ... (b) ... (c) ... (d) ...\n2) Soru iki? (a) ... (b) ... (c) ... (d) ...",
        ]);

        let outcome = summarize_text(&completer, ENGLISH_TEXT, Language::Turkish, &budgets())
            .await
            .unwrap();
        assert!(outcome.translated);
        assert!(!outcome.summary.is_empty());

        let quiz = generate_quiz(&completer, &outcome.summary, Language::Turkish, &budgets())
            .await
            .unwrap();
        assert!(!quiz.is_empty());
        assert!(quiz.contains('?'));

        // No prompt ever left with an unsubstituted placeholder
        for (prompt, _) in completer.calls() {
            assert!(!prompt.contains(prompts::PLACEHOLDER));
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_propagates() {
        // One canned response: translation succeeds, then the summary call
        // runs the well dry and the upstream error surfaces unchanged.
        let completer = RecordingCompleter::new(vec!["çeviri"]);
        let result = summarize_text(&completer, ENGLISH_TEXT, Language::Turkish, &budgets()).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }
}
