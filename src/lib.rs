//! # ytdlp-web
//!
//! A small web front end for yt-dlp: submit a URL, follow the downloader's
//! output line by line, then fetch the finished file.
//!
//! ## Design
//!
//! - **One job at a time** - a second start while a job runs is rejected
//! - **Pull-based progress** - clients poll for new log lines; each line is
//!   delivered once and the stream ends with a completion sentinel
//! - **Pluggable runner** - the [`ProcessRunner`] trait hides how yt-dlp is
//!   launched, so jobs can be driven by a [`ScriptedRunner`] in tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ytdlp_web::{CommandRunner, Config, JobRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let registry = JobRegistry::new(config.clone(), Arc::new(CommandRunner));
//!
//!     let handle = registry.start_new_job("https://www.youtube.com/watch?v=dQw4w9WgXcQ")?;
//!     let outcome = handle.wait().await?;
//!     println!("{:?}", outcome);
//!
//!     if let Ok(path) = registry.take_artifact() {
//!         println!("Downloaded to {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Download job state machine
pub mod job;
/// Drainable job log
pub mod log_channel;
/// Logging setup
pub mod logging;
/// Job registry shared by the API handlers
pub mod registry;
/// Artifact path resolution
pub mod resolver;
/// External process execution
pub mod runner;

use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use job::{JobHandle, JobInfo, JobOutcome, JobStatus};
pub use log_channel::{DOWNLOAD_COMPLETE, DOWNLOAD_FAILED, LogChannel, Sentinel};
pub use registry::{JobRegistry, PollResult};
pub use resolver::{ArtifactResolver, MarkerKind};
pub use runner::{CommandRunner, Invocation, ProcessRunner, ScriptedRunner};

/// How long shutdown waits for a running job to be killed and finish
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Serve the API until a termination signal arrives, then shut down cleanly.
///
/// On the signal the registry stops accepting jobs and cancels the running
/// one; once the server has drained, this waits (bounded) for the job to end.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use ytdlp_web::{CommandRunner, Config, JobRegistry, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Arc::new(Config::default());
///     let registry = JobRegistry::new(config.clone(), Arc::new(CommandRunner));
///
///     run_with_shutdown(registry, config).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(registry: JobRegistry, config: Arc<Config>) -> Result<()> {
    let on_signal = registry.clone();
    let signal = async move {
        wait_for_signal().await;
        tracing::info!("Shutting down: no new downloads accepted");
        on_signal.shutdown();
    };

    api::start_api_server(registry.clone(), config, signal).await?;

    if registry.shutdown_and_wait(SHUTDOWN_GRACE).await {
        tracing::info!("Shutdown complete");
    }
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments; fall back to ctrl_c
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for Ctrl+C only");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
        _ = ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received SIGINT signal (Ctrl+C)"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
