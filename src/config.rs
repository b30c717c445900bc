//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER__HOST, APP_SERVER__PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The generative-API credential (`OPENAI_API_KEY`) deliberately does NOT
//! live here: it is read straight from the process environment at startup by
//! the chat client, and a missing key aborts startup.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, models, generation,
/// limits) makes it easier to understand and maintain as the pipeline grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub generation: GenerationConfig,
    pub limits: LimitsConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16, // u16 = unsigned 16-bit integer (0-65535), perfect for port numbers
}

/// AI model configuration settings.
///
/// ## Fields:
/// - `whisper_model`: Which Whisper model to load at startup ("tiny", "base", "small", "medium", "large")
/// - `device`: Compute device preference for inference ("auto", "cpu", "cuda", "metal")
/// - `chat_model`: Fixed model identifier sent to the generative text API
/// - `chat_api_base`: Base URL of the generative text API (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub whisper_model: String,
    pub device: String,
    pub chat_model: String,
    pub chat_api_base: String,
}

/// Generation budgets: the maximum number of output tokens requested from
/// the generative text API per call.
///
/// The asymmetry is intentional: translation may need to reproduce the whole
/// input, while summaries and quizzes are condensed by definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub translation_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub quiz_max_tokens: u32,
}

/// Request-size limits for the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration
/// file exists: tiny Whisper, gpt-3.5-turbo, and the 1000/500/500 token
/// budgets.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            models: ModelsConfig {
                whisper_model: "tiny".to_string(),
                device: "auto".to_string(),
                chat_model: "gpt-3.5-turbo".to_string(),
                chat_api_base: "https://api.openai.com/v1".to_string(),
            },
            generation: GenerationConfig {
                translation_max_tokens: 1000,
                summary_max_tokens: 500,
                quiz_max_tokens: 500,
            },
            limits: LimitsConfig {
                max_upload_bytes: 50 * 1024 * 1024, // 50MB audio uploads
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__PORT=3000`: Override server port
    /// - `APP_MODELS__WHISPER_MODEL=base`: Override whisper model
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    ///
    /// The section separator is a double underscore: field names themselves
    /// contain single underscores (`whisper_model`, `max_upload_bytes`), so
    /// a single-underscore separator would split them into nonexistent keys.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Keep a single underscore after the APP prefix; without an
            // explicit prefix separator the section separator would apply
            // there too, demanding APP__SERVER__PORT
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        // Deployment platforms commonly inject these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong. A zero token budget
    /// would make every generative call return nothing, so it fails here.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.generation.translation_max_tokens == 0
            || self.generation.summary_max_tokens == 0
            || self.generation.quiz_max_tokens == 0
        {
            return Err(anyhow::anyhow!(
                "Generation token budgets must be greater than 0"
            ));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.models.chat_model.trim().is_empty() {
            return Err(anyhow::anyhow!("Chat model identifier cannot be empty"));
        }

        if self.models.chat_api_base.trim().is_empty() {
            return Err(anyhow::anyhow!("Chat API base URL cannot be empty"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// This method allows updating only some fields, not the entire
    /// configuration. For example `{"generation": {"summary_max_tokens": 800}}`
    /// changes only the summary budget.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(models) = partial_config.get("models") {
            if let Some(whisper) = models.get("whisper_model").and_then(|v| v.as_str()) {
                self.models.whisper_model = whisper.to_string();
            }
            if let Some(device) = models.get("device").and_then(|v| v.as_str()) {
                self.models.device = device.to_string();
            }
            if let Some(chat) = models.get("chat_model").and_then(|v| v.as_str()) {
                self.models.chat_model = chat.to_string();
            }
            if let Some(base) = models.get("chat_api_base").and_then(|v| v.as_str()) {
                self.models.chat_api_base = base.to_string();
            }
        }

        if let Some(generation) = partial_config.get("generation") {
            if let Some(v) = generation
                .get("translation_max_tokens")
                .and_then(|v| v.as_u64())
            {
                self.generation.translation_max_tokens = v as u32;
            }
            if let Some(v) = generation.get("summary_max_tokens").and_then(|v| v.as_u64()) {
                self.generation.summary_max_tokens = v as u32;
            }
            if let Some(v) = generation.get("quiz_max_tokens").and_then(|v| v.as_u64()) {
                self.generation.quiz_max_tokens = v as u32;
            }
        }

        if let Some(limits) = partial_config.get("limits") {
            if let Some(v) = limits.get("max_upload_bytes").and_then(|v| v.as_u64()) {
                self.limits.max_upload_bytes = v as usize;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.models.whisper_model, "tiny");
        assert_eq!(config.generation.translation_max_tokens, 1000);
        assert_eq!(config.generation.summary_max_tokens, 500);
        assert_eq!(config.generation.quiz_max_tokens, 500);
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.summary_max_tokens = 0;
        assert!(config.validate().is_err());
    }

    /// Test that runtime configuration updates work correctly.
    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"generation": {"summary_max_tokens": 800}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.generation.summary_max_tokens, 800);
        // Other fields should remain unchanged
        assert_eq!(config.generation.quiz_max_tokens, 500);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"generation": {"quiz_max_tokens": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }

    /// Environment overrides must reach nested keys whose field names
    /// themselves contain underscores.
    #[test]
    fn test_env_override_reaches_underscored_keys() {
        std::env::set_var("APP_MODELS__WHISPER_MODEL", "base");
        let result = AppConfig::load();
        std::env::remove_var("APP_MODELS__WHISPER_MODEL");

        let config = result.unwrap();
        assert_eq!(config.models.whisper_model, "base");
    }
}
