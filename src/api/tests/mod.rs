use super::*;
use crate::downloader::Collaborators;
use crate::test_helpers::{
    FakeDetail, FakeExtractor, FakeListing, FakeMedia, FakeResolver, FakeSessionFactory,
    MemoryRecords, fast_config, session,
};
use crate::types::{Task, TaskId, TaskStatus};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;


/// Router over a downloader whose listing yields one video and one image item
fn test_app(config: Config) -> (Router, Arc<BatchDownloader>) {
    test_app_with_delay(config, Duration::ZERO)
}

fn test_app_with_delay(config: Config, delay: Duration) -> (Router, Arc<BatchDownloader>) {
    let session = session(
        FakeListing::new(&[&["v1", "i1"]]),
        FakeDetail::slow(&[("v1", "video:v1"), ("i1", "image:i1")], delay),
        FakeMedia::new(),
        FakeResolver::Resolves("abc".into()),
    );
    let config = Arc::new(config);
    let downloader = Arc::new(BatchDownloader::with_collaborators(
        config.clone(),
        Collaborators {
            sessions: FakeSessionFactory::new(session),
            extractor: Arc::new(FakeExtractor),
            records: MemoryRecords::with(&[]),
        },
    ));
    (create_router(downloader.clone(), config), downloader)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()))
    };
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Poll the status endpoint until the task is terminal
async fn wait_terminal(app: &Router, task_id: &str) -> Task {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (status, body) = send(app, get(&format!("/xhs/tasks/{task_id}"))).await;
            assert_eq!(status, StatusCode::OK);
            let task: Task = serde_json::from_value(body).unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish in time")
}

#[tokio::test]
async fn test_cors_headers_present_when_enabled() {
    let mut config = fast_config();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".into()];
    let (app, _downloader) = test_app(config);

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
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_headers_absent_when_disabled() {
    let mut config = fast_config();
    config.server.api.cors_enabled = false;
    let (app, _downloader) = test_app(config);

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

#[tokio::test]
async fn test_api_key_guards_task_routes() {
    let mut config = fast_config();
    config.server.api.api_key = Some("s3cret".into());
    let (app, _downloader) = test_app(config);

    let (status, _) = send(&app, get("/xhs/tasks")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/xhs/tasks")
        .header("X-Api-Key", "s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_server_stops_after_shutdown() {
    let mut config = fast_config();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let (_app, downloader) = test_app(config);

    let server = downloader.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(50)).await;

    downloader.shutdown().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(2), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
