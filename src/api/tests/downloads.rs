use super::*;
use serde_json::json;

fn succeeding(name: &str) -> ScriptedRunner {
    ScriptedRunner::new()
        .line(format!("[download] Destination: {name}"))
        .create_file(name)
        .line("[download] 100% of 1.00MiB in 00:00:01")
}

#[tokio::test]
async fn test_full_download_flow() {
    let (registry, config, temp_dir) = create_test_registry(succeeding("Some_Title.mp4"));
    let app = create_router(registry, config);

    let response = app
        .clone()
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "started");
    assert_eq!(body["url"], URL);

    let polls = poll_until_finished(&app).await;
    let last = polls.last().unwrap();
    assert_eq!(last["status"], "complete");
    let lines: Vec<String> = polls
        .iter()
        .flat_map(|p| p["lines"].as_array().unwrap().clone())
        .map(|l| l.as_str().unwrap().to_string())
        .collect();
    assert!(lines.contains(&"Located file: Some_Title.mp4".to_string()));
    assert_eq!(lines.last().unwrap(), crate::log_channel::DOWNLOAD_COMPLETE);

    let response = app.clone().oneshot(get("/file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"Some_Title.mp4\"; filename*=UTF-8''Some_Title.mp4"
    );
    assert_eq!(response.headers()["content-length"], "8");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"scripted");

    // the artifact is handed out once; the file itself stays on disk
    let response = app.clone().oneshot(get("/file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["code"], "not_ready");
    assert!(temp_dir.path().join("Some_Title.mp4").is_file());
}

#[tokio::test]
async fn test_file_before_any_job_is_not_ready() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry, config);

    let response = app.oneshot(get("/file")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_ready");
    assert_eq!(body["error"]["message"], "file not ready");
}

#[tokio::test]
async fn test_logs_without_job_is_empty_running() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry, config);

    let response = app.oneshot(get("/logs")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["lines"], json!([]));
    assert_eq!(body["finished"], false);
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn test_failed_download_reports_failed() {
    let runner = ScriptedRunner::new()
        .line("ERROR: [generic] Unable to download webpage")
        .exit_code(1);
    let (registry, config, _temp_dir) = create_test_registry(runner);
    let app = create_router(registry, config);

    app.clone()
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();
    let polls = poll_until_finished(&app).await;

    assert_eq!(polls.last().unwrap()["status"], "failed");
    let response = app.clone().oneshot(get("/file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/job")).await.unwrap();
    let job = json_body(response).await;
    assert_eq!(job["status"], "failed");
    assert_eq!(job["exit_code"], 1);
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry, config);

    let response = app
        .oneshot(post_json("/download", json!({ "url": "javascript:alert(1)" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "invalid_url");
}

#[tokio::test]
async fn test_missing_url_field_is_client_error() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry, config);

    let response = app
        .oneshot(post_json("/download", json!({ "link": URL })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_second_start_while_running_conflicts() {
    let runner = ScriptedRunner::new().sleep(Duration::from_secs(30));
    let (registry, config, _temp_dir) = create_test_registry(runner);
    let app = create_router(registry.clone(), config);

    let response = app
        .clone()
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .clone()
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"]["code"], "job_in_progress");

    registry.shutdown();
}

#[tokio::test]
async fn test_job_snapshot_and_cancel() {
    let runner = ScriptedRunner::new()
        .line("[download] Destination: long.mp4")
        .sleep(Duration::from_secs(30));
    let (registry, config, _temp_dir) = create_test_registry(runner);
    let app = create_router(registry, config);

    let response = app.clone().oneshot(get("/job")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();

    let response = app.clone().oneshot(get("/job")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let job = json_body(response).await;
    assert_eq!(job["url"], URL);
    assert!(job["status"] == "pending" || job["status"] == "running");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(response).await["status"], "cancelling");

    let polls = poll_until_finished(&app).await;
    assert_eq!(polls.last().unwrap()["status"], "failed");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/job/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_after_shutdown_is_unavailable() {
    let (registry, config, _temp_dir) = create_test_registry(ScriptedRunner::new());
    let app = create_router(registry.clone(), config);
    registry.shutdown();

    let response = app
        .oneshot(post_json("/download", json!({ "url": URL })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
