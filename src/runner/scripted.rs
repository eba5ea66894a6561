//! In-process runner that replays canned output

use super::traits::{ExitOutcome, Invocation, ProcessRunner, RunningProcess};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// One step of a scripted run
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit an output line
    Line(String),
    /// Create a file (relative paths are joined to the working directory)
    CreateFile(PathBuf),
    /// Pause before the next step
    Sleep(Duration),
}

/// Runner that plays back a fixed script instead of spawning a process
///
/// Used for embedding and tests where yt-dlp is not installed. Cancellation
/// and invocation timeouts behave like [`CommandRunner`](super::CommandRunner).
///
/// # Examples
///
/// ```
/// use ytdlp_web::runner::ScriptedRunner;
///
/// let runner = ScriptedRunner::new()
///     .line("[download] Destination: clip.mp4")
///     .create_file("clip.mp4")
///     .exit_code(0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    steps: Vec<ScriptStep>,
    exit_code: i32,
    fail_spawn: bool,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    /// Create an empty script that exits with code 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an output line
    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Line(line.into()));
        self
    }

    /// Append a file creation step
    pub fn create_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.steps.push(ScriptStep::CreateFile(path.into()));
        self
    }

    /// Append a pause
    pub fn sleep(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Sleep(duration));
        self
    }

    /// Set the exit code reported after the script finishes
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Make every spawn fail as if the binary were missing
    pub fn failing_spawn(mut self) -> Self {
        self.fail_spawn = true;
        self
    }

    /// Invocations received so far
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn spawn(
        &self,
        invocation: &Invocation,
        cancel: CancellationToken,
    ) -> Result<RunningProcess> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        if self.fail_spawn {
            return Err(Error::Spawn {
                program: invocation.program.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            });
        }

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let aborted = CancellationToken::new();

        let steps = self.steps.clone();
        let exit_code = self.exit_code;
        let working_dir = invocation.working_dir.clone();
        let timeout = invocation.timeout;
        let abort_signal = aborted.clone();

        tokio::spawn(async move {
            let play = async {
                for step in steps {
                    match step {
                        ScriptStep::Line(line) => {
                            let _ = line_tx.send(line);
                        }
                        ScriptStep::CreateFile(path) => {
                            let path = working_dir.join(path);
                            if let Err(e) = tokio::fs::write(&path, b"scripted").await {
                                tracing::warn!(path = %path.display(), error = %e, "Scripted file creation failed");
                            }
                        }
                        ScriptStep::Sleep(duration) => tokio::time::sleep(duration).await,
                    }
                }
                drop(line_tx);
                ExitOutcome::Exited(exit_code)
            };
            let deadline = async {
                match timeout {
                    Some(after) => tokio::time::sleep(after).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let outcome = tokio::select! {
                outcome = play => outcome,
                _ = cancel.cancelled() => {
                    abort_signal.cancel();
                    ExitOutcome::Cancelled
                }
                _ = deadline => {
                    abort_signal.cancel();
                    ExitOutcome::TimedOut(timeout.unwrap_or_default())
                }
            };
            let _ = exit_tx.send(outcome);
        });

        Ok(RunningProcess::from_parts(line_rx, exit_rx, aborted))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
