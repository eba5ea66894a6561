//! Configuration types for ytdlp-web

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Download behavior configuration (directory, format selection, limits)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    #[schema(value_type = String)]
    pub download_dir: PathBuf,

    /// yt-dlp format selection expression
    ///
    /// Default prefers an mp4 video plus m4a audio merged into mp4, then a
    /// single-file mp4, then whatever is best.
    #[serde(default = "default_format")]
    pub format: String,

    /// yt-dlp output template, relative to `download_dir` (default: "%(title)s.%(ext)s")
    #[serde(default = "default_output_template")]
    pub output_template: String,

    /// Pass `--restrict-filenames` so names stay ASCII without spaces (default: true)
    #[serde(default = "default_true")]
    pub restrict_filenames: bool,

    /// Kill the downloader after this many seconds (None = no limit)
    #[serde(default, with = "optional_duration_serde")]
    #[schema(value_type = Option<u64>)]
    pub timeout: Option<Duration>,

    /// Marker lines retained per job for artifact resolution (default: 10000)
    ///
    /// Only destination, merge and already-downloaded lines count; progress
    /// output is relayed to the log but not kept. Oldest markers are dropped
    /// first.
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            format: default_format(),
            output_template: default_output_template(),
            restrict_filenames: true,
            timeout: None,
            max_log_lines: default_max_log_lines(),
        }
    }
}

/// External tool configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Extra arguments inserted before the URL (e.g. `--cookies`, `--proxy`)
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            extra_args: Vec::new(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// API server settings
    #[serde(default)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a TOML file
    ///
    /// Missing keys fall back to their defaults. The result is validated.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde defaults cannot guard
    pub fn validate(&self) -> Result<()> {
        if self.download.format.trim().is_empty() {
            return Err(Error::Config {
                message: "format must not be empty".into(),
                key: Some("download.format".into()),
            });
        }
        if self.download.output_template.trim().is_empty() {
            return Err(Error::Config {
                message: "output_template must not be empty".into(),
                key: Some("download.output_template".into()),
            });
        }
        if Path::new(&self.download.output_template).is_absolute() {
            return Err(Error::Config {
                message: "output_template must be relative to download_dir".into(),
                key: Some("download.output_template".into()),
            });
        }
        if self.download.timeout == Some(Duration::ZERO) {
            return Err(Error::Config {
                message: "timeout must be greater than zero; omit it for no limit".into(),
                key: Some("download.timeout".into()),
            });
        }
        if self.download.max_log_lines == 0 {
            return Err(Error::Config {
                message: "max_log_lines must be greater than zero".into(),
                key: Some("download.max_log_lines".into()),
            });
        }
        Ok(())
    }

    /// Resolve the yt-dlp executable to invoke
    ///
    /// An explicit `ytdlp_path` always wins. Otherwise PATH is searched when
    /// allowed, falling back to the bare program name so spawning reports a
    /// clear error if it is missing.
    pub fn ytdlp_program(&self) -> PathBuf {
        if let Some(path) = &self.tools.ytdlp_path {
            return path.clone();
        }
        if self.tools.search_path
            && let Ok(found) = which::which(YTDLP_BINARY)
        {
            return found;
        }
        PathBuf::from(YTDLP_BINARY)
    }
}

/// Name of the downloader binary looked up on PATH
pub const YTDLP_BINARY: &str = "yt-dlp";

/// API and external server integration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_format() -> String {
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".into()
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".into()
}

fn default_max_log_lines() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
