//! Task creation, queries and cancellation.

use crate::error::{Error, Result, TaskError};
use crate::pipeline::BatchJob;
use crate::types::{BatchRequest, ListingMode, SessionOptions, Task, TaskId};
use std::any::Any;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::BatchDownloader;

impl BatchDownloader {
    /// Register a batch task for `mode` and start it in the background
    ///
    /// Returns as soon as the task is registered; progress is observed through
    /// [`task`](Self::task) or [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) has begun
    /// - [`Error::Config`] for an empty `profile_url`, a zero `limit`, or a
    ///   session that cannot be opened (e.g. a malformed proxy)
    pub async fn create_task(&self, mode: ListingMode, request: BatchRequest) -> Result<TaskId> {
        if !self.jobs.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let profile_url = request.profile_url.trim();
        if profile_url.is_empty() {
            return Err(Error::Config {
                message: "profile_url must not be empty".into(),
                key: Some("profile_url".into()),
            });
        }
        if request.limit == Some(0) {
            return Err(Error::Config {
                message: "limit must be at least 1".into(),
                key: Some("limit".into()),
            });
        }

        let options = SessionOptions::resolve(
            request.cookie.as_deref(),
            request.proxy.as_deref(),
            self.config.request.cookie.as_deref(),
            self.config.request.proxy.as_deref(),
        );
        let session = self.sessions.open(&options)?;

        let id = self.tasks.create(mode).await;
        let job = BatchJob {
            task_id: id,
            mode,
            profile_url: profile_url.to_string(),
            limit: request.limit,
            video_only: mode.video_only(),
        };

        let cancel = CancellationToken::new();
        self.jobs.active.lock().await.insert(id, cancel.clone());

        tracing::info!(
            task_id = %id,
            mode = %mode,
            limit = ?request.limit,
            proxied = options.proxy.is_some(),
            "Batch task created"
        );

        let runner = self.runner.clone();
        let driver = tokio::spawn(async move { runner.run(job, session, cancel).await });

        // Supervisor: a driver that dies without reaching a terminal state still fails its task
        let tasks = self.tasks.clone();
        let active = self.jobs.active.clone();
        tokio::spawn(async move {
            if let Err(join_error) = driver.await {
                let reason = if join_error.is_panic() {
                    format!(
                        "unexpected error: {}",
                        panic_message(join_error.into_panic())
                    )
                } else {
                    Error::Cancelled.to_string()
                };
                tracing::error!(task_id = %id, error = %reason, "Task driver terminated abnormally");

                let partial = tasks.get(id).await.map(|t| t.progress).unwrap_or_default();
                if let Err(e) = tasks.fail(id, reason, partial).await {
                    tracing::debug!(task_id = %id, error = %e, "Task already terminal");
                }
            }
            active.lock().await.remove(&id);
        });

        Ok(id)
    }

    /// Snapshot of a task
    pub async fn task(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .get(id)
            .await
            .ok_or(Error::Task(TaskError::NotFound(id)))
    }

    /// Snapshots of every retained task, oldest first
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.tasks.list().await
    }

    /// Request cancellation of a running or pending task
    ///
    /// The task stops at its next page or item boundary and ends `failed`
    /// with the error `task cancelled`.
    pub async fn cancel_task(&self, id: TaskId) -> Result<()> {
        let status = self
            .tasks
            .status(id)
            .await
            .ok_or(Error::Task(TaskError::NotFound(id)))?;

        if status.is_terminal() {
            return Err(Error::Task(TaskError::InvalidTransition {
                id,
                operation: "cancel",
                current: status,
            }));
        }

        let token = self.jobs.active.lock().await.get(&id).cloned();
        match token {
            Some(token) => {
                token.cancel();
                tracing::info!(task_id = %id, "Task cancellation requested");
            }
            None => {
                // No driver left to observe the token
                let partial = self.task(id).await?.progress;
                self.tasks
                    .fail(id, Error::Cancelled.to_string(), partial)
                    .await?;
            }
        }

        Ok(())
    }

    /// Number of tasks whose driver is still running
    pub async fn active_task_count(&self) -> usize {
        self.jobs.active.lock().await.len()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "panic with non-string payload".to_string()
}
