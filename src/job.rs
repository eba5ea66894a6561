//! Download job state machine
//!
//! A job moves `Pending → Running → {Succeeded, Failed}` and runs on its own
//! tokio task. Every output line is relayed to the [`LogChannel`] as it
//! arrives; the final outcome is published three ways: the typed
//! [`JobOutcome`] returned from the task, the shared [`JobInfo`] snapshot,
//! and a sentinel line at the end of the log stream.

use crate::error::{Error, Result};
use crate::log_channel::{LogChannel, Sentinel};
use crate::registry::ArtifactSlot;
use crate::resolver::{ArtifactResolver, MarkerKind, Resolved, is_marker};
use crate::runner::{Invocation, ProcessRunner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Number of output lines echoed back when the downloader exits non-zero
const TRAILING_LINES: usize = 5;

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, worker task not yet started
    Pending,
    /// Downloader running
    Running,
    /// File located and ready to be taken
    Succeeded,
    /// Ended without a file
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Snapshot of a job's state
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    /// URL passed to the downloader
    pub url: String,
    /// Current status
    pub status: JobStatus,
    /// Located artifact (set on success)
    #[schema(value_type = Option<String>)]
    pub resolved_path: Option<PathBuf>,
    /// Downloader exit code once it has exited
    pub exit_code: Option<i32>,
    /// Failure description
    pub error: Option<String>,
    /// When the job was created
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal state
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobInfo {
    /// A fresh pending job for `url`
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: JobStatus::Pending,
            resolved_path: None,
            exit_code: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Typed result of a finished job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// The artifact was located
    Succeeded {
        /// Path of the finished file
        path: PathBuf,
        /// Marker the path was resolved from
        marker: MarkerKind,
    },
    /// The job failed
    Failed {
        /// Machine-readable error code (see [`ToHttpStatus`](crate::ToHttpStatus))
        code: String,
        /// Human-readable reason
        reason: String,
    },
}

impl JobOutcome {
    /// Whether the job produced an artifact
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }
}

/// Shared, lock-protected job snapshot
pub(crate) type SharedInfo = Arc<RwLock<JobInfo>>;

pub(crate) fn read_info(info: &SharedInfo) -> JobInfo {
    info.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn update_info(info: &SharedInfo, f: impl FnOnce(&mut JobInfo)) {
    let mut guard = info.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard);
}

/// One download, from spawn to artifact
pub struct DownloadJob {
    pub(crate) invocation: Invocation,
    pub(crate) runner: Arc<dyn ProcessRunner>,
    pub(crate) resolver: ArtifactResolver,
    pub(crate) log: Arc<LogChannel>,
    pub(crate) artifact: Arc<ArtifactSlot>,
    pub(crate) info: SharedInfo,
    pub(crate) cancel: CancellationToken,
    pub(crate) max_log_lines: usize,
}

impl DownloadJob {
    /// Spawn the job on a new tokio task
    pub(crate) fn spawn(self) -> JobHandle {
        let cancel = self.cancel.clone();
        let info = self.info.clone();
        let task = tokio::spawn(self.run());
        JobHandle { task, cancel, info }
    }

    /// Drive the job to a terminal state
    ///
    /// Never returns an error: every failure becomes a log line followed by
    /// the failure sentinel. The terminal status is published together with
    /// the closing lines, so a job that looks finished has already written
    /// its sentinel.
    pub async fn run(self) -> JobOutcome {
        let url = read_info(&self.info).url;
        update_info(&self.info, |info| info.status = JobStatus::Running);
        self.log.append(format!("Starting download: {}", url));
        tracing::info!(url = %url, runner = self.runner.name(), "Download job started");

        match self.execute().await {
            Ok(resolved) => {
                let closing = [
                    format!("Located file: {}", file_label(&resolved.path)),
                    Sentinel::Complete.as_line().to_string(),
                ];
                self.log.append_final(closing, || {
                    self.artifact.set(resolved.path.clone());
                    update_info(&self.info, |info| {
                        info.status = JobStatus::Succeeded;
                        info.resolved_path = Some(resolved.path.clone());
                        info.finished_at = Some(Utc::now());
                    });
                });
                tracing::info!(
                    url = %url,
                    path = %resolved.path.display(),
                    marker = ?resolved.marker,
                    "Download job succeeded"
                );
                JobOutcome::Succeeded {
                    path: resolved.path,
                    marker: resolved.marker,
                }
            }
            Err(e) => {
                let code = crate::error::ToHttpStatus::error_code(&e).to_string();
                let reason = e.to_string();

                let mut closing = Vec::new();
                if let Error::ProcessExit {
                    trailing_output, ..
                } = &e
                    && !trailing_output.is_empty()
                {
                    closing.push("Last output from downloader:".to_string());
                    closing.extend(trailing_output.iter().map(|line| format!("  {}", line)));
                }
                closing.push(format!("Download failed: {}", reason));
                closing.push(Sentinel::Failed.as_line().to_string());

                self.log.append_final(closing, || {
                    update_info(&self.info, |info| {
                        info.status = JobStatus::Failed;
                        info.error = Some(reason.clone());
                        info.finished_at = Some(Utc::now());
                    });
                });
                tracing::warn!(url = %url, error = %e, "Download job failed");
                JobOutcome::Failed { code, reason }
            }
        }
    }

    async fn execute(&self) -> Result<Resolved> {
        let mut process = self
            .runner
            .spawn(&self.invocation, self.cancel.clone())
            .await?;

        // marker lines are kept for resolution however long the run; the
        // tail only feeds the failure report
        let mut markers: VecDeque<String> = VecDeque::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(TRAILING_LINES);
        while let Some(line) = process.next_line().await {
            // child output must never forge a terminal signal
            let relayed = if Sentinel::parse(&line).is_some() {
                format!(" {}", line)
            } else {
                line.clone()
            };
            self.log.append(relayed);

            if is_marker(&line) {
                if markers.len() == self.max_log_lines {
                    markers.pop_front();
                }
                markers.push_back(line.clone());
            }
            if tail.len() == TRAILING_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }

        let code = process.wait().await?;
        update_info(&self.info, |info| info.exit_code = Some(code));
        tracing::debug!(exit_code = code, markers = markers.len(), "Downloader exited");

        if code != 0 {
            return Err(Error::ProcessExit {
                code,
                trailing_output: tail.into(),
            });
        }

        self.resolver.resolve(markers.make_contiguous())
    }
}

fn file_label(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Handle to a spawned job
///
/// Lets callers await completion deterministically instead of polling the
/// log for sentinels.
pub struct JobHandle {
    task: JoinHandle<JobOutcome>,
    cancel: CancellationToken,
    info: SharedInfo,
}

impl JobHandle {
    /// Current snapshot of the job
    pub fn info(&self) -> JobInfo {
        read_info(&self.info)
    }

    /// Request cancellation; the job fails once the downloader is killed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the worker task has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish
    ///
    /// # Errors
    ///
    /// Only fails if the worker task panicked or was aborted.
    pub async fn wait(self) -> Result<JobOutcome> {
        self.task
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("job task failed: {}", e))))
    }

    pub(crate) fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }
}
