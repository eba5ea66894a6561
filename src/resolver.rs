//! Locate the finished file from yt-dlp's output
//!
//! yt-dlp does not report its final artifact in a structured way, so the
//! path is inferred from marker lines, most reliable first:
//!
//! 1. `[Merger] Merging formats into "<path>"` (last one wins)
//! 2. `[download] Destination: <path>` or
//!    `[download] <path> has already been downloaded` (last one wins),
//!    skipping per-format intermediates such as `video.f137.mp4`
//!
//! There is no directory-listing fallback. Guessing by filename prefix is
//! unreliable once `--restrict-filenames` rewrites titles.

use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use utoipa::ToSchema;

struct Markers {
    merger: Regex,
    destination: Regex,
    already_downloaded: Regex,
    intermediate: Regex,
}

// Patterns are literals; failure to compile is a programming error caught by tests.
#[allow(clippy::expect_used)]
static MARKERS: LazyLock<Markers> = LazyLock::new(|| Markers {
    merger: Regex::new(r#"^\[Merger\] Merging formats into "(.+)"$"#).expect("merger pattern"),
    destination: Regex::new(r"^\[download\] Destination: (.+)$").expect("destination pattern"),
    already_downloaded: Regex::new(r"^\[download\] (.+) has already been downloaded$")
        .expect("already-downloaded pattern"),
    intermediate: Regex::new(r"\.f\d+\.[^.]+$").expect("intermediate pattern"),
});

/// Which kind of marker line produced the artifact path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// Audio and video streams were merged into this container
    Merger,
    /// A single-stream download destination
    Destination,
    /// The file existed from an earlier run
    AlreadyDownloaded,
}

/// A successfully resolved artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Existing regular file inside the download directory
    pub path: PathBuf,
    /// Marker the path came from
    pub marker: MarkerKind,
}

/// Resolves artifact paths against one download directory
#[derive(Clone, Debug)]
pub struct ArtifactResolver {
    download_dir: PathBuf,
}

impl ArtifactResolver {
    /// Create a resolver for files under `download_dir`
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
        }
    }

    /// Determine the finished file from the complete output of one run
    ///
    /// # Errors
    ///
    /// Returns [`Error::Resolution`] if no usable marker exists, if the
    /// chosen path is not an existing regular file, or if it lies outside
    /// the download directory.
    pub fn resolve(&self, lines: &[String]) -> Result<Resolved> {
        let (raw, marker) = find_candidate(lines).ok_or_else(|| {
            Error::Resolution("output contained no merge or destination line".into())
        })?;

        let path = self.anchor(Path::new(&raw));
        let metadata = std::fs::metadata(&path).map_err(|e| {
            Error::Resolution(format!("{} is not accessible: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(Error::Resolution(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        self.ensure_contained(&path)?;

        tracing::debug!(path = %path.display(), ?marker, "Resolved downloaded file");
        Ok(Resolved { path, marker })
    }

    fn anchor(&self, raw: &Path) -> PathBuf {
        if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.download_dir.join(raw)
        }
    }

    fn ensure_contained(&self, path: &Path) -> Result<()> {
        let root = std::fs::canonicalize(&self.download_dir)?;
        let file = std::fs::canonicalize(path)?;
        if file.starts_with(&root) {
            Ok(())
        } else {
            Err(Error::Resolution(format!(
                "{} is outside the download directory",
                path.display()
            )))
        }
    }
}

/// Pick the most reliable candidate path from the output, newest first
pub fn find_candidate(lines: &[String]) -> Option<(String, MarkerKind)> {
    let markers = &*MARKERS;

    let merged = lines.iter().rev().find_map(|line| {
        markers
            .merger
            .captures(line.trim())
            .map(|caps| caps[1].to_string())
    });
    if let Some(path) = merged {
        return Some((path, MarkerKind::Merger));
    }

    lines.iter().rev().find_map(|line| {
        let line = line.trim();
        let (path, marker) = if let Some(caps) = markers.destination.captures(line) {
            (caps[1].trim().to_string(), MarkerKind::Destination)
        } else if let Some(caps) = markers.already_downloaded.captures(line) {
            (caps[1].trim().to_string(), MarkerKind::AlreadyDownloaded)
        } else {
            return None;
        };
        (!path.is_empty() && !is_intermediate(&path)).then_some((path, marker))
    })
}

/// Whether a line is one of the markers [`find_candidate`] looks at
pub fn is_marker(line: &str) -> bool {
    let markers = &*MARKERS;
    let line = line.trim();
    markers.merger.is_match(line)
        || markers.destination.is_match(line)
        || markers.already_downloaded.is_match(line)
}

/// Whether a file name denotes a single-format intermediate (`name.f137.mp4`)
pub fn is_intermediate(path: &str) -> bool {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    MARKERS.intermediate.is_match(&name)
}
