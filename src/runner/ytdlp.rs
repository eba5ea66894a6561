//! yt-dlp command line construction

use super::traits::Invocation;
use crate::config::Config;
use std::path::{Path, PathBuf};

/// Build the yt-dlp invocation for one URL
///
/// The output template is anchored at the absolute download directory so
/// yt-dlp prints absolute destination paths. `--newline` keeps progress on
/// separate lines and `--no-playlist` keeps one URL to one artifact. The URL
/// follows `--` so it can never be parsed as an option.
pub fn ytdlp_invocation(config: &Config, url: &str) -> Invocation {
    let download_dir = absolute_dir(config.download_dir());
    let output = download_dir.join(&config.download.output_template);

    let mut args = vec![
        "--newline".to_string(),
        "--no-playlist".to_string(),
        "-f".to_string(),
        config.download.format.clone(),
        "-o".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    if config.download.restrict_filenames {
        args.push("--restrict-filenames".to_string());
    }
    args.extend(config.tools.extra_args.iter().cloned());
    args.push("--".to_string());
    args.push(url.to_string());

    Invocation {
        program: config.ytdlp_program(),
        args,
        working_dir: download_dir,
        timeout: config.download.timeout,
    }
}

fn absolute_dir(dir: &Path) -> PathBuf {
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}
