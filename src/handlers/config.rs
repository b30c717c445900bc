//! Runtime configuration endpoints. The generative credential is never
//! exposed here; it lives only in the process environment.

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Get the current configuration.
///
/// ## Endpoint: `GET /api/v1/config`
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": {
            "server": {
                "host": config.server.host,
                "port": config.server.port
            },
            "models": {
                "whisper_model": config.models.whisper_model,
                "device": config.models.device,
                "chat_model": config.models.chat_model,
                "chat_api_base": config.models.chat_api_base
            },
            "generation": {
                "translation_max_tokens": config.generation.translation_max_tokens,
                "summary_max_tokens": config.generation.summary_max_tokens,
                "quiz_max_tokens": config.generation.quiz_max_tokens
            },
            "limits": {
                "max_upload_bytes": config.limits.max_upload_bytes
            }
        }
    })))
}

/// Apply a partial configuration update at runtime.
///
/// ## Endpoint: `PUT /api/v1/config`
///
/// Accepts a JSON object with any subset of the configuration fields, e.g.
/// `{"generation": {"summary_max_tokens": 800}}`. The merged configuration
/// is validated before it replaces the live one. Changing `whisper_model`
/// here does not reload the engine; the new value takes effect on restart.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": {
            "models": {
                "whisper_model": current_config.models.whisper_model,
                "device": current_config.models.device,
                "chat_model": current_config.models.chat_model,
                "chat_api_base": current_config.models.chat_api_base
            },
            "generation": {
                "translation_max_tokens": current_config.generation.translation_max_tokens,
                "summary_max_tokens": current_config.generation.summary_max_tokens,
                "quiz_max_tokens": current_config.generation.quiz_max_tokens
            },
            "limits": {
                "max_upload_bytes": current_config.limits.max_upload_bytes
            }
        }
    })))
}
