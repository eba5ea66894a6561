//! Error types for ytdlp-web
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (spawn, exit, resolution, hand-off)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for ytdlp-web operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ytdlp-web
///
/// Errors raised inside a job's worker task are converted into log lines and
/// never reach request handlers. Only the start, cancel and retrieval paths
/// surface these synchronously.
#[derive(Debug, Error)]
pub enum Error {
    /// The downloader program could not be launched
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was being launched
        program: String,
        /// Underlying OS error (missing binary, permission denied, ...)
        #[source]
        source: std::io::Error,
    },

    /// The downloader program exited with a non-zero status
    #[error("downloader exited with code {code}")]
    ProcessExit {
        /// Exit code, -1 when the process was terminated by a signal
        code: i32,
        /// Last lines of output before the process exited
        trailing_output: Vec<String>,
    },

    /// The downloader was terminated before it finished
    #[error("download cancelled: {0}")]
    Cancelled(String),

    /// No artifact path could be determined from the output
    #[error("could not locate downloaded file: {0}")]
    Resolution(String),

    /// Artifact requested before completion or after it was already taken
    #[error("file not ready")]
    NotReady,

    /// A job is already pending or running
    #[error("a download is already in progress")]
    JobInProgress,

    /// The submitted URL is not an http(s) URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Requested resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "not_ready",
///     "message": "file not ready"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_ready", "invalid_url")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::InvalidUrl(_) => 400,
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotReady => 404,
            Error::NotFound(_) => 404,

            // 409 Conflict - one job at a time
            Error::JobInProgress => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Resolution(_) => 500,

            // 502 Bad Gateway - the external downloader failed
            Error::ProcessExit { .. } => 502,
            Error::Cancelled(_) => 502,

            // 503 Service Unavailable
            Error::Spawn { .. } => 503,
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Spawn { .. } => "spawn_failed",
            Error::ProcessExit { .. } => "process_exit",
            Error::Cancelled(_) => "cancelled",
            Error::Resolution(_) => "resolution_failed",
            Error::NotReady => "not_ready",
            Error::JobInProgress => "job_in_progress",
            Error::InvalidUrl(_) => "invalid_url",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Spawn { program, .. } => Some(serde_json::json!({
                "program": program,
            })),
            Error::ProcessExit {
                code,
                trailing_output,
            } => Some(serde_json::json!({
                "exit_code": code,
                "trailing_output": trailing_output,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        match details {
            Some(details) => ApiError::with_details(code, message, details),
            None => ApiError::new(code, message),
        }
    }
}
