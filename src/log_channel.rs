//! Drainable log buffer shared between a job's worker task and poll requests
//!
//! A single job writes lines in the order yt-dlp prints them; any number of
//! request handlers drain them. Draining is destructive: each line is handed
//! to exactly one poller, never replayed.
//!
//! Two reserved lines, [`DOWNLOAD_COMPLETE`] and [`DOWNLOAD_FAILED`], travel
//! in-band to signal the end of a job. They are turned into a typed
//! [`Sentinel`] as soon as a drain sees them.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sentinel line appended after a job succeeds
pub const DOWNLOAD_COMPLETE: &str = "__DOWNLOAD_COMPLETE__";

/// Sentinel line appended after a job fails
pub const DOWNLOAD_FAILED: &str = "__DOWNLOAD_FAILED__";

/// Terminal signal carried by a sentinel line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentinel {
    /// The artifact is ready to be taken
    Complete,
    /// The job ended without an artifact
    Failed,
}

impl Sentinel {
    /// Recognize a sentinel line (exact match only)
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            DOWNLOAD_COMPLETE => Some(Sentinel::Complete),
            DOWNLOAD_FAILED => Some(Sentinel::Failed),
            _ => None,
        }
    }

    /// The wire form of this sentinel
    pub fn as_line(self) -> &'static str {
        match self {
            Sentinel::Complete => DOWNLOAD_COMPLETE,
            Sentinel::Failed => DOWNLOAD_FAILED,
        }
    }

    /// Status reported to pollers once this sentinel has been seen
    pub fn status_label(self) -> &'static str {
        match self {
            Sentinel::Complete => "complete",
            Sentinel::Failed => "failed",
        }
    }
}

/// Thread-safe, unbounded FIFO of log lines
///
/// All operations take one short critical section and never perform I/O
/// while holding the lock, so the lock is a plain `std::sync::Mutex` that
/// both the async worker and synchronous callers can use.
#[derive(Debug, Default)]
pub struct LogChannel {
    lines: Mutex<VecDeque<String>>,
}

impl LogChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the tail
    pub fn append(&self, line: impl Into<String>) {
        self.lock().push_back(line.into());
    }

    /// Append a job's closing lines and run `publish` under the same lock
    ///
    /// Whatever `publish` makes visible (a terminal job status, a ready
    /// artifact) can only be observed once these lines are buffered, and no
    /// [`clear`](Self::clear) can fall between the two. `publish` must not
    /// touch this channel.
    pub fn append_final<I, F>(&self, lines: I, publish: F)
    where
        I: IntoIterator,
        I::Item: Into<String>,
        F: FnOnce(),
    {
        let mut buffered = self.lock();
        buffered.extend(lines.into_iter().map(Into::into));
        publish();
    }

    /// Remove and return every buffered line, oldest first
    pub fn drain_all(&self) -> Vec<String> {
        self.lock().drain(..).collect()
    }

    /// Discard every buffered line
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scan drained lines for a terminal sentinel
///
/// Returns the first sentinel found. A job emits at most one.
pub fn find_sentinel(lines: &[String]) -> Option<Sentinel> {
    lines.iter().find_map(|line| Sentinel::parse(line))
}
