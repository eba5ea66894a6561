use super::*;
use crate::Config;
use crate::runner::ScriptedRunner;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

mod downloads;

const URL: &str = "https://www.youtube.com/watch?v=abc";

/// Registry and config rooted in a fresh temp download directory
fn create_test_registry(runner: ScriptedRunner) -> (JobRegistry, Arc<Config>, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().to_path_buf();
    config.tools.ytdlp_path = Some(temp_dir.path().join("missing-yt-dlp"));
    let config = Arc::new(config);
    let registry = JobRegistry::new(config.clone(), Arc::new(runner));
    (registry, config, temp_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Poll /logs until the batch carrying the sentinel arrives
async fn poll_until_finished(app: &Router) -> Vec<serde_json::Value> {
    let mut polls = Vec::new();
    for _ in 0..500 {
        let response = app.clone().oneshot(get("/logs")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let poll = json_body(response).await;
        let finished = poll["finished"].as_bool().unwrap();
        polls.push(poll);
        if finished {
            return polls;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job never finished");
}

#[tokio::test]
async fn test_api_server_serves_until_shutdown() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());

    let mut config = (*config).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(registry, config, async move {
        let _ = stop_rx.await;
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());

    let mut config = (*config).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(registry, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());

    let mut config = (*config).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(registry, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn test_cors_specific_origins() {
    // builds without panicking for a mix of valid and invalid origins
    let _layer = build_cors_layer(&[
        "http://localhost:3000".to_string(),
        "not a header\nvalue".to_string(),
    ]);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry, config);

    let response = app.oneshot(get("/downloads")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
