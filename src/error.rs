//! # Error Handling
//!
//! Two layers of errors live in this service:
//!
//! - [`crate::services::ServiceError`] is produced by the remote speech and language
//!   adapters and describes what went wrong on the wire.
//! - [`AppError`] is the HTTP boundary type. Every handler returns `Result<_, AppError>`
//!   and actix-web turns the error into a JSON response through [`ResponseError`].
//!
//! ## JSON Response Format:
//! ```json
//! {
//!   "error": {
//!     "type": "upstream_error",
//!     "message": "OpenAI API error (401): Invalid API key",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use crate::services::ServiceError;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Errors surfaced to HTTP clients.
///
/// ## Error Categories:
/// - **BadRequest**: Client sent a malformed request (400)
/// - **ValidationError**: A required field is missing or out of range (400)
/// - **Upstream**: A remote speech/language service failed (502)
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid or malformed data
    BadRequest(String),

    /// User input failed validation rules
    ValidationError(String),

    /// Transcription, generation or synthesis failed remotely
    Upstream(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Upstream(msg) => write!(f, "Upstream service error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Converts errors into HTTP responses with a consistent JSON body.
///
/// ## HTTP Status Code Mapping:
/// - BadRequest/ValidationError → 400 (Bad Request)
/// - Upstream → 502 (Bad Gateway)
impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_type, message) = match self {
            AppError::BadRequest(msg) => ("bad_request", msg),
            AppError::ValidationError(msg) => ("validation_error", msg),
            AppError::Upstream(msg) => ("upstream_error", msg),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Remote service failures are not recovered locally; they surface as 502.
impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        AppError::Upstream(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
