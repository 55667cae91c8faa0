//! End-to-end batch runs against a mocked platform
//!
//! One wiremock server plays the listing API, the detail pages and the media
//! CDN, so a task runs through the real HTTP session, extractor and database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{detail_page, listing_page, offline_config};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xhs_dl::{
    BatchDownloader, BatchRequest, Event, ListingMode, RecordStore, Task, TaskId, TaskStatus,
};

const PROFILE: &str = "https://www.xiaohongshu.com/user/profile/5f0c0000000000000001";

async fn mount_platform(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/sns/web/v1/user_posted"))
        .and(query_param("cursor", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            &[("n1", Some("tok1")), ("n2", None)],
            "c2",
            true,
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sns/web/v1/user_posted"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_page(
            &[("n3", None)],
            "",
            false,
        )))
        .mount(server)
        .await;

    let video = detail_page(
        "n1",
        json!({
            "noteId": "n1",
            "title": "clip",
            "type": "video",
            "user": { "userId": "u1", "nickname": "poster" },
            "video": { "media": { "stream": { "h264": [
                { "masterUrl": format!("{}/media/n1.mp4", server.uri()) }
            ] } } }
        }),
    );
    let gallery = detail_page(
        "n2",
        json!({
            "noteId": "n2",
            "title": "gallery",
            "type": "normal",
            "user": { "userId": "u1", "nickname": "poster" },
            "imageList": [
                { "urlDefault": format!("{}/media/n2_a", server.uri()) },
                { "urlDefault": format!("{}/media/n2_b", server.uri()) }
            ]
        }),
    );

    Mock::given(method("GET"))
        .and(path("/discovery/item/n1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(video))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discovery/item/n2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(gallery))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discovery/item/n3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/media/n1.mp4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_body_bytes(b"mp4-bytes".to_vec()),
        )
        .mount(server)
        .await;
    for name in ["n2_a", "n2_b"] {
        Mock::given(method("GET"))
            .and(path(format!("/media/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(b"jpeg-bytes".to_vec()),
            )
            .mount(server)
            .await;
    }
}

async fn wait_terminal(downloader: &BatchDownloader, id: TaskId) -> Task {
    for _ in 0..500 {
        let task = downloader.task(id).await.unwrap();
        if task.status.is_terminal() {
            return task;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("task {id} did not finish");
}

fn request() -> BatchRequest {
    BatchRequest {
        profile_url: PROFILE.into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_posted_batch_downloads_media_and_records_items() {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let dir = TempDir::new().unwrap();
    let config = offline_config(&server.uri(), dir.path());
    let download_dir = config.download.download_dir.clone();

    let downloader = BatchDownloader::new(config).await.unwrap();
    let mut events = downloader.subscribe();

    let id = downloader
        .create_task(ListingMode::Posted, request())
        .await
        .unwrap();
    let task = wait_terminal(&downloader, id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.summary.all, 3);
    assert_eq!(task.summary.success, 2);
    assert_eq!(task.summary.fail, 1);
    assert_eq!(task.summary, task.progress);
    assert_eq!(task.errors.len(), 1);
    assert!(task.errors[0].contains("n3"), "errors: {:?}", task.errors);

    let video = download_dir.join("u1_n1_1.mp4");
    assert_eq!(std::fs::read(&video).unwrap(), b"mp4-bytes");
    assert!(download_dir.join("u1_n2_1.jpg").exists());
    assert!(download_dir.join("u1_n2_2.jpg").exists());

    let db = xhs_dl::Database::new(&dir.path().join("xhs-dl.db"))
        .await
        .unwrap();
    assert!(db.exists("n1").await.unwrap());
    assert!(db.exists("n2").await.unwrap());
    assert!(!db.exists("n3").await.unwrap());

    let mut saw_created = false;
    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::TaskCreated { id: created, .. } if created == id => saw_created = true,
            Event::TaskCompleted { id: done, .. } if done == id => saw_completed = true,
            _ => {}
        }
    }
    assert!(saw_created);
    assert!(saw_completed);
}

#[tokio::test]
async fn test_second_run_skips_recorded_items() {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let dir = TempDir::new().unwrap();
    let downloader = BatchDownloader::new(offline_config(&server.uri(), dir.path()))
        .await
        .unwrap();

    let first = downloader
        .create_task(ListingMode::Posted, request())
        .await
        .unwrap();
    wait_terminal(&downloader, first).await;

    let second = downloader
        .create_task(ListingMode::Posted, request())
        .await
        .unwrap();
    let task = wait_terminal(&downloader, second).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.summary.all, 3);
    assert_eq!(task.summary.skip, 2);
    assert_eq!(task.summary.success, 0);
    assert_eq!(task.summary.fail, 1);
}

#[tokio::test]
async fn test_limit_stops_walk_after_first_page() {
    let server = MockServer::start().await;
    mount_platform(&server).await;
    let dir = TempDir::new().unwrap();
    let downloader = BatchDownloader::new(offline_config(&server.uri(), dir.path()))
        .await
        .unwrap();

    let id = downloader
        .create_task(
            ListingMode::Posted,
            BatchRequest {
                limit: Some(1),
                ..request()
            },
        )
        .await
        .unwrap();
    let task = wait_terminal(&downloader, id).await;

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.summary.all, 1);
    assert_eq!(task.summary.success, 1);

    let listing_calls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/sns/web/v1/user_posted")
        .count();
    assert_eq!(listing_calls, 1);
}

#[tokio::test]
async fn test_unresolvable_profile_fails_task() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let downloader = BatchDownloader::new(offline_config(&server.uri(), dir.path()))
        .await
        .unwrap();

    let id = downloader
        .create_task(
            ListingMode::Posted,
            BatchRequest {
                profile_url: "not a profile link".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let task = wait_terminal(&downloader, id).await;

    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.summary.all, 0);
    assert!(!task.errors.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}
