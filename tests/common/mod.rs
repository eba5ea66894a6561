//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use ytdlp_web::{CommandRunner, Config, JobRegistry, PollResult};

/// Write an executable shell script standing in for yt-dlp
#[cfg(unix)]
pub fn write_fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-yt-dlp");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Registry using the real process runner against `program`
pub fn command_registry(program: PathBuf, download_dir: &Path) -> JobRegistry {
    let mut config = Config::default();
    config.download.download_dir = download_dir.to_path_buf();
    config.tools.ytdlp_path = Some(program);
    JobRegistry::new(Arc::new(config), Arc::new(CommandRunner))
}

/// Poll until the batch carrying the sentinel arrives, collecting every batch
pub async fn poll_until_finished(registry: &JobRegistry) -> Vec<PollResult> {
    let mut polls = Vec::new();
    for _ in 0..1000 {
        let poll = registry.poll_logs();
        let done = poll.finished;
        polls.push(poll);
        if done {
            return polls;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never finished");
}

/// All lines from a sequence of polls, in order
pub fn all_lines(polls: &[PollResult]) -> Vec<String> {
    polls.iter().flat_map(|p| p.lines.iter().cloned()).collect()
}
