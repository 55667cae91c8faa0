//! Background service starters - task retention sweeper.

use chrono::Utc;

use super::BatchDownloader;

impl BatchDownloader {
    /// Evict terminal tasks that finished longer ago than `tasks.retention`
    ///
    /// Returns the number of evicted tasks.
    pub async fn sweep_expired_tasks(&self) -> usize {
        let Ok(retention) = chrono::Duration::from_std(self.config.tasks.retention) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
            return 0;
        };

        let evicted = self.tasks.evict_finished_before(cutoff).await;
        if evicted > 0 {
            tracing::info!(evicted, "Evicted expired tasks");
        }
        evicted
    }

    /// Start the retention sweeper that runs every `tasks.sweep_interval`
    ///
    /// The sweeper stops once [`shutdown`](Self::shutdown) completes.
    pub fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let downloader = self.clone();
        let interval = self.config.tasks.sweep_interval;

        if interval.is_zero() {
            tracing::info!("Task sweep interval is zero, skipping retention sweeper");
            return tokio::spawn(async {});
        }

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = downloader.jobs.shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        downloader.sweep_expired_tasks().await;
                    }
                }
            }
            tracing::debug!("Retention sweeper stopped");
        });

        tracing::info!(
            retention_secs = self.config.tasks.retention.as_secs(),
            sweep_interval_secs = interval.as_secs(),
            "Retention sweeper started"
        );

        handle
    }
}
