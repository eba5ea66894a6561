//! Process runner backed by `tokio::process`

use super::traits::{ExitOutcome, Invocation, ProcessRunner, RunningProcess};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Runs the downloader as a real child process
///
/// Each spawn starts three small tasks: one reader per output pipe feeding a
/// shared line channel, and a supervisor that waits for the child, killing it
/// on cancellation or timeout.
///
/// # Examples
///
/// ```no_run
/// use ytdlp_web::runner::{CommandRunner, Invocation, ProcessRunner};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let invocation = Invocation {
///     program: "yt-dlp".into(),
///     args: vec!["--version".into()],
///     working_dir: ".".into(),
///     timeout: None,
/// };
/// let mut process = CommandRunner.spawn(&invocation, CancellationToken::new()).await?;
/// while let Some(line) = process.next_line().await {
///     println!("{line}");
/// }
/// let code = process.wait().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn spawn(
        &self,
        invocation: &Invocation,
        cancel: CancellationToken,
    ) -> Result<RunningProcess> {
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })?;

        tracing::debug!(
            program = %invocation.program.display(),
            pid = ?child.id(),
            "Spawned downloader process"
        );

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, line_tx));
        }

        let (exit_tx, exit_rx) = oneshot::channel();
        let aborted = CancellationToken::new();
        tokio::spawn(supervise(
            child,
            cancel,
            invocation.timeout,
            exit_tx,
            aborted.clone(),
        ));

        Ok(RunningProcess::from_parts(line_rx, exit_rx, aborted))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Forward newline-terminated chunks from a pipe as lossy UTF-8 lines
async fn forward_lines<R>(pipe: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                if tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read downloader output");
                break;
            }
        }
    }
}

/// Wait for the child to exit, or kill it on cancellation / timeout
async fn supervise(
    mut child: Child,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    exit_tx: oneshot::Sender<ExitOutcome>,
    aborted: CancellationToken,
) {
    let deadline = async {
        match timeout {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ExitOutcome::Exited(status.code().unwrap_or(-1)),
            Err(e) => {
                tracing::error!(error = %e, "Error waiting for downloader process");
                ExitOutcome::WaitFailed(e.to_string())
            }
        },
        _ = cancel.cancelled() => {
            kill(&mut child).await;
            aborted.cancel();
            ExitOutcome::Cancelled
        }
        _ = deadline => {
            tracing::warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Downloader timed out");
            kill(&mut child).await;
            aborted.cancel();
            ExitOutcome::TimedOut(timeout.unwrap_or_default())
        }
    };

    let _ = exit_tx.send(outcome);
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "Failed to kill downloader process");
    }
}
