//! # Pipeline Endpoints
//!
//! The three user-facing stages of the product — transcribe, summarize,
//! quiz — plus the language list the UI dropdown is built from.
//!
//! ## Stage independence:
//! Each stage is a separate request. The UI carries text from one stage's
//! response into the next stage's request, so nothing here holds per-user
//! session state.

use crate::audio;
use crate::error::AppError;
use crate::language::{Language, SUPPORTED_LANGUAGES};
use crate::pipeline::{self, NO_AUDIO_SENTINEL};
use crate::state::AppState;
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

/// Request body for the summarization stage.
#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    /// Source text, normally the transcript from the previous stage.
    pub text: String,

    /// Requested output language. Defaults to Turkish, matching the UI.
    #[serde(default)]
    pub language: Language,
}

/// Request body for the quiz stage.
#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    /// Source summary, normally the output of the previous stage.
    pub summary: String,

    /// Requested output language. Defaults to Turkish, matching the UI.
    #[serde(default)]
    pub language: Language,
}

/// Transcribe an uploaded audio file.
///
/// ## Endpoint: `POST /api/v1/transcribe`
///
/// ## Request:
/// Multipart form data with an audio file field named "audio". WAV files
/// are decoded per their header; anything else is treated as raw 16kHz
/// mono s16le PCM.
///
/// ## Response:
/// ```json
/// {
///   "text": "Hello, this is a short talk...",
///   "seed_text": "Hello, this is a short talk...",
///   "audio_duration": 12.4,
///   "processing_time_ms": 1500,
///   "model_name": "tiny",
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
///
/// `seed_text` repeats the transcript so the client can seed the next
/// stage's input without touching the display field.
///
/// ## No-audio case:
/// A request with no audio field (or an empty one) is not an error: it
/// returns 200 with the fixed sentinel text and never touches the model.
pub async fn transcribe(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();
    let max_bytes = config.limits.max_upload_bytes;

    let mut audio_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::ValidationError("Missing content disposition".to_string()))?;

        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))?;

        if field_name == "audio" {
            filename = content_disposition.get_filename().map(|s| s.to_string());

            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk
                    .map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
                bytes.extend_from_slice(&chunk);

                if bytes.len() > max_bytes {
                    return Err(AppError::ValidationError(format!(
                        "File too large: more than {} bytes",
                        max_bytes
                    )));
                }
            }

            audio_data = Some(bytes);
        }
    }

    let audio_bytes = match audio_data {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            warn!("Transcription request without audio, returning sentinel");
            return Ok(HttpResponse::Ok().json(json!({
                "text": NO_AUDIO_SENTINEL,
                "seed_text": NO_AUDIO_SENTINEL,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })));
        }
    };

    info!(
        filename = filename.as_deref().unwrap_or("unknown"),
        size_bytes = audio_bytes.len(),
        "Received audio upload"
    );

    let samples = audio::decode_upload(&audio_bytes)?;

    state.increment_active_transcriptions();
    let result = state.engine.transcribe(&samples).await;
    state.decrement_active_transcriptions();

    let transcription = result?;

    Ok(HttpResponse::Ok().json(json!({
        "text": transcription.text,
        "seed_text": transcription.text,
        "audio_duration": transcription.audio_duration,
        "processing_time_ms": transcription.processing_time_ms,
        "model_name": transcription.model_name,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Summarize text in the requested language.
///
/// ## Endpoint: `POST /api/v1/summarize`
///
/// Detects the language of the text, translates it to the target language
/// if the two differ, then summarizes with the target language's native
/// prompt template.
pub async fn summarize(
    state: web::Data<AppState>,
    request: web::Json<SummarizeRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();

    if request.text.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Text to summarize cannot be empty".to_string(),
        ));
    }

    let generation = state.get_config().generation;
    let outcome = pipeline::summarize_text(
        state.completer.as_ref(),
        &request.text,
        request.language,
        &generation,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "summary": outcome.summary,
        "language": request.language.name(),
        "language_code": request.language.code(),
        "detected_language": outcome.detected_code,
        "translated": outcome.translated,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Generate a multiple-choice quiz from a summary.
///
/// ## Endpoint: `POST /api/v1/quiz`
///
/// The summary is substituted into the target language's quiz template;
/// the generated questions come back as one text block, exactly as the
/// generative API produced them.
pub async fn quiz(
    state: web::Data<AppState>,
    request: web::Json<QuizRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();

    if request.summary.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Summary to generate a quiz from cannot be empty".to_string(),
        ));
    }

    let generation = state.get_config().generation;
    let quiz_text = pipeline::generate_quiz(
        state.completer.as_ref(),
        &request.summary,
        request.language,
        &generation,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "quiz": quiz_text,
        "language": request.language.name(),
        "language_code": request.language.code(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// List the supported output languages, in dropdown order.
///
/// ## Endpoint: `GET /api/v1/languages`
pub async fn languages() -> HttpResponse {
    let entries: Vec<_> = SUPPORTED_LANGUAGES
        .iter()
        .map(|lang| {
            json!({
                "name": lang.name(),
                "code": lang.code()
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "languages": entries,
        "default": Language::default().name()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::TextCompleter;
    use crate::transcription::TranscriptionEngine;
    use actix_web::{test as actix_test, App};
    use async_trait::async_trait;
    use candle_core::Device;
    use std::sync::Arc;

    struct NullCompleter;

    #[async_trait]
    impl TextCompleter for NullCompleter {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, AppError> {
            Ok(String::new())
        }
    }

    fn test_state() -> AppState {
        AppState::new(
            AppConfig::default(),
            Arc::new(TranscriptionEngine::new(Device::Cpu)),
            Arc::new(NullCompleter),
        )
    }

    /// Multipart body containing only the terminal boundary: a well-formed
    /// upload with no fields at all.
    fn empty_multipart() -> (String, String) {
        let boundary = "----transcribe-test-boundary";
        let content_type = format!("multipart/form-data; boundary={}", boundary);
        let body = format!("--{}--\r\n", boundary);
        (content_type, body)
    }

    #[actix_web::test]
    async fn test_missing_audio_returns_sentinel_without_model() {
        // The engine has no model loaded, so any transcription attempt would
        // error out. A 200 with the sentinel proves the model was never touched.
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/api/v1/transcribe", web::post().to(transcribe)),
        )
        .await;

        let (content_type, body) = empty_multipart();
        let req = actix_test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .insert_header(("content-type", content_type))
            .set_payload(body)
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let json: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(json["text"], NO_AUDIO_SENTINEL);
        assert_eq!(json["seed_text"], NO_AUDIO_SENTINEL);
    }

    #[actix_web::test]
    async fn test_empty_audio_field_returns_sentinel() {
        // An "audio" field with zero bytes is treated the same as no field
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/api/v1/transcribe", web::post().to(transcribe)),
        )
        .await;

        let boundary = "----transcribe-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"empty.wav\"\r\n\
             Content-Type: audio/wav\r\n\r\n\r\n--{b}--\r\n",
            b = boundary
        );
        let req = actix_test::TestRequest::post()
            .uri("/api/v1/transcribe")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();

        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let json: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(json["text"], NO_AUDIO_SENTINEL);
    }

    #[test]
    fn test_summarize_request_parsing() {
        let json = r#"{"text": "hello world", "language": "Arabic"}"#;
        let request: SummarizeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.text, "hello world");
        assert_eq!(request.language, Language::Arabic);
    }

    #[test]
    fn test_summarize_request_defaults_to_turkish() {
        let json = r#"{"text": "hello world"}"#;
        let request: SummarizeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.language, Language::Turkish);
    }

    #[test]
    fn test_quiz_request_parsing() {
        let json = r#"{"summary": "a short summary", "language": "Japanese"}"#;
        let request: QuizRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.summary, "a short summary");
        assert_eq!(request.language, Language::Japanese);
    }

    #[test]
    fn test_unknown_language_rejected() {
        let json = r#"{"text": "hello", "language": "Klingon"}"#;
        let result: Result<SummarizeRequest, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
