use super::*;

#[tokio::test]
async fn test_shutdown_cancels_running_tasks_and_rejects_new_ones() {
    let (downloader, _factory, _records) = downloader_with(fast_config(), slow_session());

    let id = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    downloader.shutdown().await.unwrap();

    assert!(!downloader.is_accepting());
    assert_eq!(downloader.active_task_count().await, 0);

    let task = downloader.task(id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.errors.last().map(String::as_str), Some("task cancelled"));

    let rejected = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await;
    assert!(matches!(rejected, Err(Error::ShuttingDown)));
}

#[tokio::test]
async fn test_shutdown_with_no_tasks_is_immediate() {
    let (downloader, _factory, _records) = downloader_with(fast_config(), quick_session());

    tokio::time::timeout(Duration::from_secs(1), downloader.shutdown())
        .await
        .expect("shutdown should not wait without tasks")
        .unwrap();
}

#[tokio::test]
async fn test_sweep_evicts_only_finished_tasks_past_retention() {
    let mut config = fast_config();
    config.tasks.retention = Duration::ZERO;
    let (downloader, _factory, _records) = downloader_with(config, quick_session());

    let done = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await
        .unwrap();
    wait_terminal(&downloader, done).await;
    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(downloader.sweep_expired_tasks().await, 1);
    assert!(downloader.task(done).await.is_err());
    assert!(downloader.list_tasks().await.is_empty());
}

#[tokio::test]
async fn test_sweep_keeps_tasks_within_retention() {
    let (downloader, _factory, _records) = downloader_with(fast_config(), quick_session());

    let id = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await
        .unwrap();
    wait_terminal(&downloader, id).await;

    assert_eq!(downloader.sweep_expired_tasks().await, 0);
    assert!(downloader.task(id).await.is_ok());
}

#[tokio::test]
async fn test_retention_sweeper_stops_after_shutdown() {
    let mut config = fast_config();
    config.tasks.retention = Duration::ZERO;
    config.tasks.sweep_interval = Duration::from_millis(20);
    let (downloader, _factory, _records) = downloader_with(config, quick_session());

    let id = downloader
        .create_task(ListingMode::Posted, request("https://www.xiaohongshu.com/user/profile/abc"))
        .await
        .unwrap();
    wait_terminal(&downloader, id).await;

    let sweeper = downloader.start_retention_sweeper();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !downloader.list_tasks().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("sweeper should evict the finished task");

    downloader.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), sweeper)
        .await
        .expect("sweeper should stop")
        .unwrap();
}
