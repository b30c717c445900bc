//! # Chat Completions Client
//!
//! Thin reqwest client for an OpenAI-compatible `/chat/completions` endpoint.
//! There is deliberately no retry, no backoff, and no streaming here: each
//! pipeline stage makes exactly one blocking round-trip and surfaces whatever
//! the API returns.

use crate::error::AppError;
use crate::llm::TextCompleter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the API credential. Absence is fatal at startup.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Client for the generative text API.
///
/// Constructed once at startup and shared read-only across all requests;
/// reqwest's `Client` is internally reference-counted and safe to share.
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Create a client reading the credential from the process environment.
    ///
    /// ## Startup contract:
    /// A missing `OPENAI_API_KEY` is a fatal configuration error — the
    /// service refuses to start rather than failing on the first request.
    pub fn from_env(model: &str, base_url: &str) -> Result<Self, AppError> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| {
            AppError::ConfigError(format!(
                "{} must be set in the environment to reach the generative text API",
                API_KEY_ENV
            ))
        })?;

        Ok(Self::new(model, base_url, api_key))
    }

    /// Create a client with an explicit credential (used by tests with a
    /// mock HTTP server).
    pub fn new(model: &str, base_url: &str, api_key: String) -> Self {
        // Request timeout is env-overridable; a single generation call can
        // legitimately take tens of seconds at a 1000-token budget.
        let timeout_secs = env::var("APP_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(120);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client construction cannot fail with static settings");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TextCompleter for ChatClient {
    /// One stateless chat-completions round-trip.
    ///
    /// The prompt goes out as a single user message; there is no system
    /// message and no history. The response's first choice is trimmed and
    /// returned verbatim.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, AppError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            model = %self.model,
            max_tokens,
            prompt_chars = prompt.len(),
            "Sending completion request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: ChatResponse = response.json().await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AppError::Upstream("Completion response contained no choices".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_posts_single_turn_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500,
                "messages": [{"role": "user", "content": "Say hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "  hi there  "}}]}"#,
            )
            .create_async()
            .await;

        let client = ChatClient::new("gpt-3.5-turbo", &server.url(), "test-key".to_string());
        let result = client.complete("Say hi", 500).await.unwrap();

        mock.assert_async().await;
        // Responses are trimmed before being handed back to the pipeline
        assert_eq!(result, "hi there");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "rate limited"}}"#)
            .create_async()
            .await;

        let client = ChatClient::new("gpt-3.5-turbo", &server.url(), "test-key".to_string());
        let result = client.complete("Say hi", 500).await;

        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = ChatClient::new("gpt-3.5-turbo", &server.url(), "test-key".to_string());
        assert!(client.complete("Say hi", 500).await.is_err());
    }

    #[test]
    fn test_from_env_requires_credential() {
        // No other test sets this variable, so removing it here is safe
        // even with the default parallel test runner
        std::env::remove_var(API_KEY_ENV);
        assert!(ChatClient::from_env("gpt-3.5-turbo", "https://api.openai.com/v1").is_err());
    }
}
