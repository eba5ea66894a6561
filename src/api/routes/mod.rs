//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`] — Starting jobs, polling logs, fetching the file
//! - [`system`] — Health and OpenAPI

use serde::{Deserialize, Serialize};

mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use downloads::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadRequest {
    /// Page or media URL understood by yt-dlp
    pub url: String,
}

/// Response for POST /download
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct StartDownloadResponse {
    /// Always `"started"`
    pub status: String,
    /// The URL the job was started for
    pub url: String,
}

/// Response for POST /job/cancel
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// Always `"cancelling"`
    pub status: String,
    /// URL of the job being cancelled
    pub url: String,
}

/// Response for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `"ok"`, or `"degraded"` when yt-dlp cannot be found
    pub status: String,
    /// Crate version
    pub version: String,
    /// Name of the process runner in use
    pub runner: String,
    /// Whether the configured yt-dlp executable was found
    pub ytdlp_available: bool,
    /// Whether a job is pending or running
    pub busy: bool,
}
