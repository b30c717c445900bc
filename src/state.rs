//! # Application State Management
//!
//! This module manages shared state that needs to be accessed by multiple HTTP request handlers
//! simultaneously.
//!
//! ## Key Rust Concepts (IMPORTANT for beginners):
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: Multiple HTTP requests run simultaneously and all need access to the same state
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time (but not both)
//! - **Why needed**: Multiple requests can read config simultaneously, but only one can update it
//!
//! ## Process-wide collaborators:
//! Besides config and metrics, the state carries the two external
//! collaborators the pipeline needs: the transcription engine (local Whisper
//! model) and the text-completion client. Both are constructed once at
//! startup and injected here rather than reached through globals, so tests
//! can substitute mock implementations.

use crate::config::AppConfig;
use crate::llm::TextCompleter;
use crate::transcription::TranscriptionEngine;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started (never changes, so no lock needed)
    pub start_time: Instant,

    /// The process-wide Whisper engine, loaded once at startup
    pub engine: Arc<TranscriptionEngine>,

    /// The process-wide generative-API client (trait object so tests can
    /// inject a mock completer)
    pub completer: Arc<dyn TextCompleter>,
}

/// Performance metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Number of transcriptions currently running
    pub active_transcriptions: u32,

    /// Detailed metrics for each API endpoint (e.g. "POST /api/v1/summarize")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

impl AppState {
    /// Create the application state with its injected collaborators.
    pub fn new(
        config: AppConfig,
        engine: Arc<TranscriptionEngine>,
        completer: Arc<dyn TextCompleter>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            engine,
            completer,
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately so other threads aren't
    /// blocked; AppConfig is cheap to clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Update the configuration with validation.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics
            .endpoint_metrics
            .entry(endpoint.to_string())
            .or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Track a transcription starting (uploads are the only long-running calls).
    pub fn increment_active_transcriptions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.active_transcriptions += 1;
    }

    /// Track a transcription finishing. Guards against underflow.
    pub fn decrement_active_transcriptions(&self) {
        let mut metrics = self.metrics.write().unwrap();
        if metrics.active_transcriptions > 0 {
            metrics.active_transcriptions -= 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones under a read lock so metrics don't change while being
    /// serialized to JSON.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            active_transcriptions: metrics.active_transcriptions,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use async_trait::async_trait;
    use candle_core::Device;

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

    #[test]
    fn test_metrics_counting() {
        let state = test_state();
        state.increment_request_count();
        state.increment_request_count();
        state.increment_error_count();
        state.record_endpoint_request("POST /api/v1/summarize", 120, false);
        state.record_endpoint_request("POST /api/v1/summarize", 80, true);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.error_count, 1);

        let endpoint = &snapshot.endpoint_metrics["POST /api/v1/summarize"];
        assert_eq!(endpoint.request_count, 2);
        assert_eq!(endpoint.average_duration_ms(), 100.0);
        assert_eq!(endpoint.error_rate(), 0.5);
    }

    #[test]
    fn test_active_transcription_underflow_guard() {
        let state = test_state();
        state.decrement_active_transcriptions();
        assert_eq!(state.get_metrics_snapshot().active_transcriptions, 0);
    }

    #[test]
    fn test_config_update_validation() {
        let state = test_state();
        let mut bad = state.get_config();
        bad.server.port = 0;
        assert!(state.update_config(bad).is_err());
    }
}
