use super::*;
use crate::test_helpers::{
    FakeDetail, FakeExtractor, FakeListing, FakeMedia, FakeResolver, FakeSessionFactory,
    MemoryRecords, fast_config, session,
};
use crate::types::{BatchRequest, ListingMode, Task, TaskStatus};
use std::time::Duration;

mod lifecycle;

fn downloader_with(
    config: Config,
    session: crate::remote::Session,
) -> (BatchDownloader, Arc<FakeSessionFactory>, Arc<MemoryRecords>) {
    let factory = FakeSessionFactory::new(session);
    let records = MemoryRecords::with(&[]);
    let downloader = BatchDownloader::with_collaborators(
        Arc::new(config),
        Collaborators {
            sessions: factory.clone(),
            extractor: Arc::new(FakeExtractor),
            records: records.clone(),
        },
    );
    (downloader, factory, records)
}

fn quick_session() -> crate::remote::Session {
    session(
        FakeListing::new(&[&["v1", "i1"]]),
        FakeDetail::new(&[("v1", "video:v1"), ("i1", "image:i1")]),
        FakeMedia::new(),
        FakeResolver::Resolves("abc".into()),
    )
}

fn slow_session() -> crate::remote::Session {
    session(
        FakeListing::new(&[&["v1", "v2", "v3", "v4", "v5"]]),
        FakeDetail::slow(
            &[
                ("v1", "video:v1"),
                ("v2", "video:v2"),
                ("v3", "video:v3"),
                ("v4", "video:v4"),
                ("v5", "video:v5"),
            ],
            Duration::from_millis(100),
        ),
        FakeMedia::new(),
        FakeResolver::Resolves("abc".into()),
    )
}

fn request(profile_url: &str) -> BatchRequest {
    BatchRequest {
        profile_url: profile_url.into(),
        ..Default::default()
    }
}

/// Poll until the task reaches a terminal state
async fn wait_terminal(downloader: &BatchDownloader, id: TaskId) -> Task {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let task = downloader.task(id).await.unwrap();
            if task.status.is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("task did not finish in time")
}

/// Poll until no task driver is running
async fn wait_idle(downloader: &BatchDownloader) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while downloader.active_task_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("drivers did not finish in time");
}

#[tokio::test]
async fn test_new_creates_download_dir_and_database() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.persistence.database_path = temp_dir.path().join("state").join("xhs-dl.db");

    let downloader = BatchDownloader::new(config).await.unwrap();

    assert!(temp_dir.path().join("downloads").is_dir());
    assert!(temp_dir.path().join("state").join("xhs-dl.db").exists());
    assert!(downloader.list_tasks().await.is_empty());
    assert!(downloader.is_accepting());
}

#[tokio::test]
async fn test_new_rejects_malformed_default_proxy_at_task_creation() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.persistence.database_path = temp_dir.path().join("xhs-dl.db");
    config.request.proxy = Some("http://[::1".into());

    let downloader = BatchDownloader::new(config).await.unwrap();
    let result = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await;

    assert!(matches!(result, Err(Error::Config { .. })));
    assert!(downloader.list_tasks().await.is_empty());
}
