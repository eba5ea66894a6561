//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the ytdlp-web REST API using
//! utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the ytdlp-web REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ytdlp-web REST API",
        version = "0.1.0",
        description = "Start a yt-dlp download, follow its output line by line, and fetch the finished file",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::start_download,
        crate::api::routes::poll_logs,
        crate::api::routes::download_file,
        crate::api::routes::get_job,
        crate::api::routes::cancel_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Job types
        crate::job::JobStatus,
        crate::job::JobInfo,
        crate::registry::PollResult,
        crate::resolver::MarkerKind,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::ToolsConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::StartDownloadRequest,
        crate::api::routes::StartDownloadResponse,
        crate::api::routes::CancelResponse,
        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Download jobs - Start, follow, cancel, and fetch the result"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
