//! Shutdown coordination.

use crate::error::Result;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::BatchDownloader;

/// How long shutdown waits for cancelled tasks to reach a terminal state
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl BatchDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new tasks
    /// 2. Cancels all active tasks (using their cancellation tokens)
    /// 3. Waits for their drivers to finish, up to 30 seconds
    /// 4. Stops background services
    ///
    /// Cancelled tasks end `failed` with the error `task cancelled`.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.jobs.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new tasks");

        self.cancel_all().await;

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_tasks()).await {
            Ok(()) => tracing::info!("All active tasks finished"),
            Err(_) => {
                tracing::warn!("Timeout waiting for tasks to finish, proceeding with shutdown")
            }
        }

        self.jobs.shutdown.cancel();

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new tasks are still accepted
    pub fn is_accepting(&self) -> bool {
        self.jobs.accepting_new.load(Ordering::SeqCst)
    }

    /// Signal cancellation to every running task
    pub(crate) async fn cancel_all(&self) {
        let active = self.jobs.active.lock().await;
        tracing::debug!(active_count = active.len(), "Cancelling all active tasks");

        for (id, token) in active.iter() {
            tracing::debug!(task_id = %id, "Signaling cancellation");
            token.cancel();
        }
    }

    async fn wait_for_active_tasks(&self) {
        loop {
            let active_count = self.jobs.active.lock().await.len();
            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for active tasks to finish");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
