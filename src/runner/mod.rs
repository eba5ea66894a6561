//! External downloader process handling
//!
//! The core abstraction is the [`ProcessRunner`] trait: given an
//! [`Invocation`] it starts a program and returns a [`RunningProcess`], a
//! single-use stream of merged stdout/stderr lines followed by an exit code.
//!
//! - [`CommandRunner`]: spawns a real OS process with `tokio::process`
//! - [`ScriptedRunner`]: replays canned output without spawning anything
//!
//! [`ytdlp_invocation`] builds the yt-dlp command line from [`Config`](crate::Config).

mod command;
mod scripted;
mod traits;
mod ytdlp;

pub use command::CommandRunner;
pub use scripted::{ScriptStep, ScriptedRunner};
pub use traits::{ExitOutcome, Invocation, ProcessRunner, RunningProcess};
pub use ytdlp::ytdlp_invocation;
