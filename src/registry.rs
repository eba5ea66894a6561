//! Process-wide job registry
//!
//! [`JobRegistry`] owns the state shared between the HTTP handlers and the
//! running job: the [`LogChannel`], the artifact slot and the current job.
//! It is cheap to clone and is handed to whoever needs it instead of living
//! in a global.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::job::{DownloadJob, JobHandle, JobInfo, SharedInfo, read_info};
use crate::log_channel::{LogChannel, find_sentinel};
use crate::resolver::ArtifactResolver;
use crate::runner::{ProcessRunner, ytdlp_invocation};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Holds the most recent successful artifact until it is taken
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    path: Mutex<Option<PathBuf>>,
}

impl ArtifactSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PathBuf>> {
        self.path.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an artifact, replacing any previous one
    pub fn set(&self, path: PathBuf) {
        *self.lock() = Some(path);
    }

    /// Forget the stored artifact
    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Current artifact without consuming it
    pub fn peek(&self) -> Option<PathBuf> {
        self.lock().clone()
    }

    /// Take the artifact if it still exists on disk
    ///
    /// Check and clear happen under one lock, so concurrent callers get the
    /// path at most once. A path whose file vanished is discarded.
    pub fn take_existing(&self) -> Option<PathBuf> {
        let mut slot = self.lock();
        match slot.take() {
            Some(path) if path.is_file() => Some(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "Artifact disappeared before download");
                None
            }
            None => None,
        }
    }
}

/// Result of one log poll
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PollResult {
    /// Lines appended since the previous poll, in order
    pub lines: Vec<String>,
    /// Whether this batch contains a terminal sentinel
    pub finished: bool,
    /// `"complete"`, `"failed"` or `"running"`
    pub status: String,
}

struct ActiveJob {
    info: SharedInfo,
    cancel: CancellationToken,
    task: AbortHandle,
}

impl ActiveJob {
    fn in_progress(&self) -> bool {
        !self.task.is_finished() && !read_info(&self.info).status.is_terminal()
    }
}

/// Shared registry of the current download job
///
/// At most one job runs at a time; starting another while one is pending or
/// running fails with [`Error::JobInProgress`].
#[derive(Clone)]
pub struct JobRegistry {
    config: Arc<Config>,
    runner: Arc<dyn ProcessRunner>,
    log: Arc<LogChannel>,
    artifact: Arc<ArtifactSlot>,
    current: Arc<Mutex<Option<ActiveJob>>>,
    accepting: Arc<AtomicBool>,
}

impl JobRegistry {
    /// Create a registry that launches jobs through `runner`
    pub fn new(config: Arc<Config>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            config,
            runner,
            log: Arc::new(LogChannel::new()),
            artifact: Arc::new(ArtifactSlot::default()),
            current: Arc::new(Mutex::new(None)),
            accepting: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Configuration the registry was built with
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Name of the runner in use
    pub fn runner_name(&self) -> &'static str {
        self.runner.name()
    }

    fn current(&self) -> std::sync::MutexGuard<'_, Option<ActiveJob>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start downloading `url`
    ///
    /// Clears the log and any unconsumed artifact, then spawns the job and
    /// returns immediately. The returned handle can be awaited or dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`Error::JobInProgress`] if a job is pending or running
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown)
    pub fn start_new_job(&self, url: &str) -> Result<JobHandle> {
        let url = validate_url(url)?;
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let mut current = self.current();
        if current.as_ref().is_some_and(ActiveJob::in_progress) {
            return Err(Error::JobInProgress);
        }

        self.log.clear();
        self.artifact.clear();

        let info: SharedInfo = Arc::new(RwLock::new(JobInfo::pending(url.clone())));
        let job = DownloadJob {
            invocation: ytdlp_invocation(&self.config, &url),
            runner: self.runner.clone(),
            resolver: ArtifactResolver::new(self.config.download_dir()),
            log: self.log.clone(),
            artifact: self.artifact.clone(),
            info: info.clone(),
            cancel: CancellationToken::new(),
            max_log_lines: self.config.download.max_log_lines,
        };
        let cancel = job.cancel.clone();
        let handle = job.spawn();

        *current = Some(ActiveJob {
            info,
            cancel,
            task: handle.abort_handle(),
        });
        tracing::info!(url = %url, "Queued download job");
        Ok(handle)
    }

    /// Drain all log lines produced since the last poll
    ///
    /// Each line is returned to exactly one caller. `finished` is true only
    /// for the batch that carries the terminal sentinel.
    pub fn poll_logs(&self) -> PollResult {
        let lines = self.log.drain_all();
        let (finished, status) = match find_sentinel(&lines) {
            Some(sentinel) => (true, sentinel.status_label()),
            None => (false, "running"),
        };
        PollResult {
            lines,
            finished,
            status: status.to_string(),
        }
    }

    /// Take the finished artifact, at most once per successful job
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if no artifact is stored, it was already
    /// taken, or its file no longer exists.
    pub fn take_artifact(&self) -> Result<PathBuf> {
        self.artifact.take_existing().ok_or(Error::NotReady)
    }

    /// Snapshot of the current (or most recent) job
    pub fn current_job(&self) -> Option<JobInfo> {
        self.current().as_ref().map(|job| read_info(&job.info))
    }

    /// Whether a job is pending or running
    pub fn is_busy(&self) -> bool {
        self.current().as_ref().is_some_and(ActiveJob::in_progress)
    }

    /// Cancel the running job
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no job is in progress.
    pub fn cancel(&self) -> Result<JobInfo> {
        let current = self.current();
        match current.as_ref() {
            Some(job) if job.in_progress() => {
                job.cancel.cancel();
                tracing::info!("Cancellation requested for running job");
                Ok(read_info(&job.info))
            }
            _ => Err(Error::NotFound("no download in progress".into())),
        }
    }

    /// Stop accepting jobs and cancel the running one
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        if let Some(job) = self.current().as_ref()
            && job.in_progress()
        {
            job.cancel.cancel();
        }
    }

    /// [`shutdown`](Self::shutdown), then wait up to `grace` for the job to end
    ///
    /// Returns `false` if the job was still running when `grace` elapsed.
    pub async fn shutdown_and_wait(&self, grace: Duration) -> bool {
        self.shutdown();
        let deadline = tokio::time::Instant::now() + grace;
        while self.is_busy() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Job still running after shutdown grace period"
                );
                return false;
            }
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
        true
    }

    /// Whether new jobs are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidUrl("URL must not be empty".into()));
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl("URL has no host".into()));
    }
    Ok(trimmed.to_string())
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("runner", &self.runner.name())
            .field("busy", &self.is_busy())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}
