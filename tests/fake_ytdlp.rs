//! End-to-end jobs against a shell script that behaves like yt-dlp
//!
//! The script receives the real command line built from `Config`, writes
//! files into its working directory and prints yt-dlp style marker lines.

#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{all_lines, command_registry, poll_until_finished, write_fake_ytdlp};
use std::time::Duration;
use ytdlp_web::{DOWNLOAD_COMPLETE, DOWNLOAD_FAILED, Error, JobOutcome, JobStatus, MarkerKind};

const URL: &str = "https://www.youtube.com/watch?v=abc";

#[tokio::test]
async fn merged_download_is_located_and_taken_once() {
    let bin = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let script = write_fake_ytdlp(
        bin.path(),
        r#"echo "[youtube] abc: Downloading webpage"
printf v > Clip.f137.mp4
echo "[download] Destination: Clip.f137.mp4"
printf a > Clip.f140.m4a
echo "[download] Destination: Clip.f140.m4a"
printf merged > Clip.mp4
echo "[Merger] Merging formats into \"$PWD/Clip.mp4\""
rm Clip.f137.mp4 Clip.f140.m4a"#,
    );
    let registry = command_registry(script, downloads.path());

    let outcome = registry.start_new_job(URL).unwrap().wait().await.unwrap();

    match outcome {
        JobOutcome::Succeeded { path, marker } => {
            assert_eq!(marker, MarkerKind::Merger);
            assert_eq!(path.file_name().unwrap(), "Clip.mp4");
        }
        other => panic!("expected success, got {other:?}"),
    }
    let lines = all_lines(&poll_until_finished(&registry).await);
    assert_eq!(lines[0], format!("Starting download: {URL}"));
    assert_eq!(lines[1], "[youtube] abc: Downloading webpage");
    assert_eq!(lines.last().unwrap(), DOWNLOAD_COMPLETE);

    let path = registry.take_artifact().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"merged");
    assert!(matches!(registry.take_artifact(), Err(Error::NotReady)));
}

#[tokio::test]
async fn url_is_passed_last_after_double_dash() {
    let bin = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let script = write_fake_ytdlp(
        bin.path(),
        r#"for arg in "$@"; do last="$arg"; done
echo "last=$last"
echo "[download] Destination: none.mp4"
exit 0"#,
    );
    let registry = command_registry(script, downloads.path());

    registry.start_new_job(URL).unwrap().wait().await.unwrap();

    let lines = all_lines(&poll_until_finished(&registry).await);
    assert!(lines.contains(&format!("last={URL}")));
    // the destination file was never written
    assert_eq!(lines.last().unwrap(), DOWNLOAD_FAILED);
    assert_eq!(registry.current_job().unwrap().status, JobStatus::Failed);
}

#[tokio::test]
async fn stderr_is_relayed_and_exit_code_reported() {
    let bin = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let script = write_fake_ytdlp(
        bin.path(),
        r#"echo "ERROR: [generic] Unsupported URL" >&2
exit 1"#,
    );
    let registry = command_registry(script, downloads.path());

    let outcome = registry.start_new_job(URL).unwrap().wait().await.unwrap();

    assert!(matches!(outcome, JobOutcome::Failed { ref code, .. } if code == "process_exit"));
    let lines = all_lines(&poll_until_finished(&registry).await);
    assert!(lines.contains(&"ERROR: [generic] Unsupported URL".to_string()));
    assert!(
        lines
            .iter()
            .any(|l| l == "Download failed: downloader exited with code 1")
    );
    assert_eq!(registry.current_job().unwrap().exit_code, Some(1));
}

#[tokio::test]
async fn missing_binary_fails_the_job() {
    let downloads = tempfile::tempdir().unwrap();
    let registry = command_registry(downloads.path().join("no-such-yt-dlp"), downloads.path());

    let outcome = registry.start_new_job(URL).unwrap().wait().await.unwrap();

    assert!(matches!(outcome, JobOutcome::Failed { ref code, .. } if code == "spawn_failed"));
    let polls = poll_until_finished(&registry).await;
    assert_eq!(polls.last().unwrap().status, "failed");
}

#[tokio::test]
async fn shutdown_kills_a_hanging_downloader() {
    let bin = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let script = write_fake_ytdlp(
        bin.path(),
        r#"echo "[download]   0.1% of 100.00MiB"
sleep 30"#,
    );
    let registry = command_registry(script, downloads.path());
    let handle = registry.start_new_job(URL).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(registry.shutdown_and_wait(Duration::from_secs(5)).await);

    let outcome = handle.wait().await.unwrap();
    assert!(matches!(outcome, JobOutcome::Failed { ref code, .. } if code == "cancelled"));
}
