use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::hub::HubError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Hub error: {0}")]
    Hub(#[from] HubError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn masked(log_msg: &str, public: &str) -> String {
    if is_production() {
        public.to_string()
    } else {
        log_msg.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, client_message, log_message) = match &self {
            AppError::Auth(msg) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::Store(e) => {
                let log_msg = e.to_string();
                let client_msg = masked(&log_msg, "Failed to access message store");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", client_msg, log_msg)
            }
            AppError::Hub(e) => {
                let log_msg = e.to_string();
                let client_msg = masked(&log_msg, "Service temporarily unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "HUB_UNAVAILABLE", client_msg, log_msg)
            }
        };

        // Always log the detailed error server-side
        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
