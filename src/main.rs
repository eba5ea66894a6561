//! `ytdlp-web` server binary.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use ytdlp_web::logging::{LogLevel, init_logging};
use ytdlp_web::{CommandRunner, Config, JobRegistry, run_with_shutdown};

/// Command-line arguments for `ytdlp-web`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ytdlp-web",
    version,
    about = "Web front end for yt-dlp: start a download, follow its log, fetch the file.",
    long_about = None
)]
struct CliArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides `server.api.bind_address`).
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Directory downloads are written to (overrides `download.download_dir`).
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUST_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> ytdlp_web::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level)?;

    let mut config = match &args.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };
    if let Some(bind) = args.bind {
        config.server.api.bind_address = bind;
    }
    if let Some(dir) = args.download_dir {
        config.download.download_dir = dir;
    }
    config.validate()?;

    std::fs::create_dir_all(config.download_dir())?;
    let ytdlp = config.ytdlp_program();
    if which::which(&ytdlp).is_err() {
        tracing::warn!(
            program = %ytdlp.display(),
            "yt-dlp not found; downloads will fail until it is installed"
        );
    }
    tracing::info!(
        download_dir = %config.download_dir().display(),
        ytdlp = %ytdlp.display(),
        "Configuration loaded"
    );

    let config = Arc::new(config);
    let registry = JobRegistry::new(config.clone(), Arc::new(CommandRunner));
    run_with_shutdown(registry, config).await
}
