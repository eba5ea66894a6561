//! Traits and types for running the external downloader

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// What to launch and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory of the child
    pub working_dir: PathBuf,
    /// Kill the child after this long (None = no limit)
    pub timeout: Option<Duration>,
}

/// How the child process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own (code -1 when killed by a signal)
    Exited(i32),
    /// The cancellation token fired and the process was killed
    Cancelled,
    /// The invocation timeout elapsed and the process was killed
    TimedOut(Duration),
    /// Waiting on the process failed
    WaitFailed(String),
}

/// A spawned process: a one-shot stream of output lines plus its exit status
///
/// Stdout and stderr are merged. Lines from the same stream keep their order;
/// lines from different streams interleave in arrival order.
pub struct RunningProcess {
    lines: mpsc::UnboundedReceiver<String>,
    exit: oneshot::Receiver<ExitOutcome>,
    aborted: CancellationToken,
}

impl RunningProcess {
    /// Assemble a process handle from its channels
    ///
    /// `aborted` is fired by the supervisor once the child has been killed;
    /// from then on [`next_line`](Self::next_line) only hands out what is
    /// already buffered instead of waiting for the pipes to close.
    pub fn from_parts(
        lines: mpsc::UnboundedReceiver<String>,
        exit: oneshot::Receiver<ExitOutcome>,
        aborted: CancellationToken,
    ) -> Self {
        Self {
            lines,
            exit,
            aborted,
        }
    }

    /// Next output line, or `None` once the output is exhausted
    pub async fn next_line(&mut self) -> Option<String> {
        if self.aborted.is_cancelled() {
            return self.lines.try_recv().ok();
        }
        tokio::select! {
            biased;
            line = self.lines.recv() => line,
            _ = self.aborted.cancelled() => self.lines.try_recv().ok(),
        }
    }

    /// Wait for the process to end and return its exit code
    ///
    /// A non-zero code is returned as `Ok`; the caller decides what it means.
    /// Cancellation and timeouts are reported as [`Error::Cancelled`].
    pub async fn wait(self) -> Result<i32> {
        match self.exit.await {
            Ok(ExitOutcome::Exited(code)) => Ok(code),
            Ok(ExitOutcome::Cancelled) => Err(Error::Cancelled("cancelled by request".into())),
            Ok(ExitOutcome::TimedOut(after)) => Err(Error::Cancelled(format!(
                "timed out after {}s",
                after.as_secs()
            ))),
            Ok(ExitOutcome::WaitFailed(reason)) => Err(Error::Io(std::io::Error::other(format!(
                "failed to wait for downloader: {}",
                reason
            )))),
            Err(_) => Err(Error::Io(std::io::Error::other(
                "process supervisor stopped without reporting an exit status",
            ))),
        }
    }
}

/// Trait for launching the external downloader
///
/// Implementations can spawn real OS processes ([`CommandRunner`]) or replay
/// canned output ([`ScriptedRunner`]).
///
/// [`CommandRunner`]: super::CommandRunner
/// [`ScriptedRunner`]: super::ScriptedRunner
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Start the program described by `invocation`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Spawn`] if the program cannot be launched. No output
    /// lines exist in that case.
    async fn spawn(
        &self,
        invocation: &Invocation,
        cancel: CancellationToken,
    ) -> Result<RunningProcess>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}
