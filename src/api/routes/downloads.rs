//! Download handlers: start a job, poll its log, fetch the file.

use super::{CancelResponse, StartDownloadRequest, StartDownloadResponse};
use crate::api::AppState;
use crate::error::Error;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::Path;
use tokio_util::io::ReaderStream;

/// POST /download - Start a new download job
#[utoipa::path(
    post,
    path = "/download",
    tag = "downloads",
    request_body = StartDownloadRequest,
    responses(
        (status = 202, description = "Job started", body = StartDownloadResponse),
        (status = 400, description = "Invalid URL", body = crate::error::ApiError),
        (status = 409, description = "A download is already in progress", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<StartDownloadRequest>,
) -> Result<impl IntoResponse, Error> {
    let handle = state.registry.start_new_job(&request.url)?;
    let url = handle.info().url;
    // the registry tracks the job; nothing here needs to await it
    drop(handle);

    Ok((
        StatusCode::ACCEPTED,
        Json(StartDownloadResponse {
            status: "started".to_string(),
            url,
        }),
    ))
}

/// GET /logs - Drain log lines produced since the last poll
#[utoipa::path(
    get,
    path = "/logs",
    tag = "downloads",
    responses(
        (status = 200, description = "New log lines and completion state", body = crate::registry::PollResult)
    )
)]
pub async fn poll_logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.poll_logs())
}

/// GET /file - Download the finished file (once)
#[utoipa::path(
    get,
    path = "/file",
    tag = "downloads",
    responses(
        (status = 200, description = "The finished file as an attachment", content_type = "application/octet-stream"),
        (status = 404, description = "No file ready", body = crate::error::ApiError)
    )
)]
pub async fn download_file(State(state): State<AppState>) -> Result<Response, Error> {
    let path = state.registry.take_artifact()?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Artifact could not be opened");
        Error::NotReady
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();

    tracing::info!(path = %path.display(), bytes = ?length, "Serving downloaded file");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(&path));
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| Error::ApiServerError(e.to_string()))
}

/// GET /job - Current or most recent job
#[utoipa::path(
    get,
    path = "/job",
    tag = "downloads",
    responses(
        (status = 200, description = "Job snapshot", body = crate::job::JobInfo),
        (status = 404, description = "No job has been started", body = crate::error::ApiError)
    )
)]
pub async fn get_job(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    state
        .registry
        .current_job()
        .map(Json)
        .ok_or_else(|| Error::NotFound("no job has been started".into()))
}

/// POST /job/cancel - Cancel the running job
#[utoipa::path(
    post,
    path = "/job/cancel",
    tag = "downloads",
    responses(
        (status = 202, description = "Cancellation requested", body = CancelResponse),
        (status = 404, description = "No download in progress", body = crate::error::ApiError)
    )
)]
pub async fn cancel_job(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let info = state.registry.cancel()?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            status: "cancelling".to_string(),
            url: info.url,
        }),
    ))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(&name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition(Path::new("/downloads/My_Video.mp4")),
            "attachment; filename=\"My_Video.mp4\"; filename*=UTF-8''My_Video.mp4"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii_and_quotes() {
        let header = content_disposition(Path::new("/downloads/Café \"live\".mkv"));
        assert!(header.starts_with("attachment; filename=\"Caf_ _live_.mkv\""));
        assert!(header.ends_with("filename*=UTF-8''Caf%C3%A9%20%22live%22.mkv"));
    }
}
