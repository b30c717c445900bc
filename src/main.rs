//! # Audio Quiz Backend - Main Application Entry Point
//!
//! This is the main entry point for the audio-quiz-backend web server.
//! It serves a browser UI and the three-stage pipeline behind it:
//! transcribe an uploaded recording, summarize the transcript in a chosen
//! language, and generate a quiz from the summary.
//!
//! ## Key Rust Concepts Used:
//! - **async/await**: The entire application is asynchronous for better performance
//! - **modules**: Code is organized into separate modules (mod statements)
//! - **Result<T, E>**: Error handling using Rust's Result type
//! - **Arc & RwLock**: Thread-safe shared state management
//! - **static**: Global variables that live for the entire program duration
//!
//! ## Application Architecture:
//! - **config**: Handles application configuration (TOML files + environment variables)
//! - **state**: Manages shared application state, metrics, and the injected collaborators
//! - **language**: The supported output languages and text language detection
//! - **prompts**: Per-language prompt templates for summaries and quizzes
//! - **llm**: Client for the generative text API (translation, summaries, quizzes)
//! - **transcription**: Local Whisper model loading and inference
//! - **audio**: Decoding uploaded audio into model-ready samples
//! - **pipeline**: The translate/summarize/quiz stage logic
//! - **handlers**: HTTP request handlers for API endpoints and the UI
//! - **health**: System health and metrics endpoints
//! - **middleware**: Custom request processing logic (logging, metrics)
//! - **error**: Custom error types and HTTP error responses

mod audio;
mod config;
mod device;
mod error;
mod handlers;
mod health;
mod language;
mod llm;
mod middleware;
mod pipeline;
mod prompts;
mod state;
mod transcription;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::{ModelSize, TranscriptionEngine};

/// Global shutdown signal that can be accessed from anywhere in the program.
/// AtomicBool is thread-safe, meaning multiple threads can safely read/write to it.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// The main application entry point.
///
/// ## What this function does:
/// 1. **Loads configuration** from files and environment variables
/// 2. **Validates the prompt templates** so a broken template fails fast
/// 3. **Loads the Whisper model** for the transcription stage
/// 4. **Creates the generative API client** (fails fast without a credential)
/// 5. **Configures the HTTP server** with middleware and routes
/// 6. **Handles graceful shutdown** when receiving system signals
///
/// ## Fail-fast startup:
/// Everything a request will need later is checked here: configuration,
/// templates, model weights, and the API credential. A problem with any of
/// them aborts startup with a clear message instead of failing on the
/// first user request.
#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting audio-quiz-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    // Every template must exist and carry exactly one substitution slot
    prompts::validate_templates()
        .map_err(|e| anyhow::anyhow!("Prompt template validation failed: {}", e))?;

    // Resolve the compute device and load the Whisper model before binding
    // the port, so the server never accepts a request it cannot serve
    let whisper_size: ModelSize = config
        .models
        .whisper_model
        .parse()
        .context("Invalid whisper_model in configuration")?;
    let compute_device = device::device_from_config(&config.models.device);
    info!(
        "Loading Whisper '{}' model on {}",
        whisper_size,
        device::describe(&compute_device)
    );

    let engine = Arc::new(TranscriptionEngine::new(compute_device));
    engine
        .load_model(whisper_size)
        .await
        .context("Failed to load the Whisper model at startup")?;

    // The credential check happens here, not on the first request
    let completer = Arc::new(
        llm::ChatClient::from_env(&config.models.chat_model, &config.models.chat_api_base)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?,
    );
    info!(
        "Generative API client ready (model: {})",
        config.models.chat_model
    );

    let app_state = AppState::new(config.clone(), engine, completer);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        // The UI is served from the same origin, but CORS stays open so the
        // API can also be driven from other local tooling
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api/v1")
                    .route("/transcribe", web::post().to(handlers::transcribe))
                    .route("/summarize", web::post().to(handlers::summarize))
                    .route("/quiz", web::post().to(handlers::quiz))
                    .route("/languages", web::get().to(handlers::languages))
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config)),
            )
            // Also provide health check at root level for convenience
            .route("/health", web::get().to(health::health_check))
            .route("/", web::get().to(handlers::index))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // Wait for either the server to finish OR a shutdown signal
    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize the tracing (logging) system for the application.
///
/// ## Environment Variables:
/// - `RUST_LOG`: Controls what gets logged (e.g., "debug", "info", "audio_quiz_backend=debug")
/// - If not set, defaults to "audio_quiz_backend=debug,actix_web=info"
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_quiz_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Set up signal handlers for graceful shutdown.
///
/// Listens for SIGTERM and SIGINT; when either arrives the global shutdown
/// flag is set and the main task stops the server, letting in-flight
/// requests (which can be long transcription or generation calls) finish.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Wait for the shutdown signal to be set.
///
/// Simple polling loop; 100ms granularity is plenty for process shutdown.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
