//! In-memory task registry and lifecycle state machine
//!
//! [`TaskStore`] owns every [`Task`]. Each task sits behind its own lock, so
//! concurrent jobs never contend with each other when they push progress.
//! Callers only ever see clones.
//!
//! Every accepted transition is broadcast as an [`Event`].


use crate::error::TaskError;
use crate::types::{Event, ListingMode, Statistics, Task, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};

type TaskResult<T> = std::result::Result<T, TaskError>;

/// Registry of batch tasks
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Arc<Mutex<Task>>>>,
    event_tx: broadcast::Sender<Event>,
}

impl TaskStore {
    /// Create an empty store that publishes lifecycle events on `event_tx`
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Register a new `pending` task with zeroed counters
    pub async fn create(&self, mode: ListingMode) -> TaskId {
        let id = TaskId::new();
        let task = Task {
            task_id: id,
            mode,
            status: TaskStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            progress: Statistics::default(),
            summary: Statistics::default(),
            errors: Vec::new(),
        };

        self.tasks
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(task)));

        tracing::info!(task_id = %id, mode = %mode, "Task created");
        self.emit(Event::TaskCreated { id, mode });
        id
    }

    /// `pending → running`, fixing the link count for the rest of the task's life
    pub async fn mark_running(&self, id: TaskId, total: u64) -> TaskResult<()> {
        let slot = self.slot(id).await?;
        let mut task = slot.lock().await;

        if task.status != TaskStatus::Pending {
            return Err(TaskError::InvalidTransition {
                id,
                operation: "mark_running",
                current: task.status,
            });
        }

        task.status = TaskStatus::Running;
        task.progress = Statistics::with_total(total);
        drop(task);

        tracing::info!(task_id = %id, total, "Task running");
        self.emit(Event::TaskStarted { id, total });
        Ok(())
    }

    /// Replace the running task's counters with a full snapshot
    ///
    /// Rejected when the snapshot changes `all`, overshoots it, or handles
    /// fewer links than the previous snapshot did.
    pub async fn update_progress(&self, id: TaskId, snapshot: Statistics) -> TaskResult<()> {
        let slot = self.slot(id).await?;
        let mut task = slot.lock().await;

        if task.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                id,
                operation: "update_progress",
                current: task.status,
            });
        }
        check_snapshot(id, &task.progress, &snapshot)?;

        task.progress = snapshot;
        drop(task);

        self.emit(Event::TaskProgress {
            id,
            progress: snapshot,
        });
        Ok(())
    }

    /// Append a message to a live task's error log
    pub async fn add_error(&self, id: TaskId, message: impl Into<String>) -> TaskResult<()> {
        let slot = self.slot(id).await?;
        let mut task = slot.lock().await;

        if task.status.is_terminal() {
            return Err(TaskError::InvalidTransition {
                id,
                operation: "add_error",
                current: task.status,
            });
        }

        task.errors.push(message.into());
        Ok(())
    }

    /// `running → completed`; `summary` becomes both progress and summary
    pub async fn complete(&self, id: TaskId, summary: Statistics) -> TaskResult<()> {
        let slot = self.slot(id).await?;
        let mut task = slot.lock().await;

        if task.status != TaskStatus::Running {
            return Err(TaskError::InvalidTransition {
                id,
                operation: "complete",
                current: task.status,
            });
        }
        check_snapshot(id, &task.progress, &summary)?;

        task.status = TaskStatus::Completed;
        task.finished_at = Some(Utc::now());
        task.progress = summary;
        task.summary = summary;
        drop(task);

        tracing::info!(
            task_id = %id,
            all = summary.all,
            success = summary.success,
            fail = summary.fail,
            skip = summary.skip,
            filtered = summary.filtered,
            "Task completed"
        );
        self.emit(Event::TaskCompleted { id, summary });
        Ok(())
    }

    /// Any live state `→ failed`, recording `reason` and freezing the partial counters
    pub async fn fail(
        &self,
        id: TaskId,
        reason: impl Into<String>,
        partial_summary: Statistics,
    ) -> TaskResult<()> {
        let reason = reason.into();
        let slot = self.slot(id).await?;
        let mut task = slot.lock().await;

        if task.status.is_terminal() {
            return Err(TaskError::InvalidTransition {
                id,
                operation: "fail",
                current: task.status,
            });
        }

        task.errors.push(reason.clone());
        task.status = TaskStatus::Failed;
        task.finished_at = Some(Utc::now());
        task.progress = partial_summary;
        task.summary = partial_summary;
        drop(task);

        tracing::warn!(task_id = %id, error = %reason, "Task failed");
        self.emit(Event::TaskFailed {
            id,
            error: reason,
            summary: partial_summary,
        });
        Ok(())
    }

    /// Snapshot of a task, or `None` when the id is unknown
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        let slot = self.tasks.read().await.get(&id).cloned()?;
        let task = slot.lock().await.clone();
        Some(task)
    }

    /// Current status of a task
    pub async fn status(&self, id: TaskId) -> Option<TaskStatus> {
        let slot = self.tasks.read().await.get(&id).cloned()?;
        let status = slot.lock().await.status;
        Some(status)
    }

    /// Snapshots of every task, oldest first
    pub async fn list(&self) -> Vec<Task> {
        let slots: Vec<_> = self.tasks.read().await.values().cloned().collect();

        let mut tasks = Vec::with_capacity(slots.len());
        for slot in slots {
            tasks.push(slot.lock().await.clone());
        }
        tasks.sort_by_key(|t| t.started_at);
        tasks
    }

    /// Number of registered tasks
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Drop terminal tasks that finished before `cutoff`; returns how many were evicted
    pub async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut tasks = self.tasks.write().await;

        let mut expired = Vec::new();
        for (id, slot) in tasks.iter() {
            let task = slot.lock().await;
            if task.status.is_terminal() && task.finished_at.is_some_and(|at| at < cutoff) {
                expired.push(*id);
            }
        }

        for id in &expired {
            tasks.remove(id);
        }

        if !expired.is_empty() {
            tracing::debug!(evicted = expired.len(), "Evicted finished tasks");
        }
        expired.len()
    }

    async fn slot(&self, id: TaskId) -> TaskResult<Arc<Mutex<Task>>> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

fn check_snapshot(id: TaskId, current: &Statistics, next: &Statistics) -> TaskResult<()> {
    if next.all != current.all {
        return Err(TaskError::InvalidProgress {
            id,
            reason: format!("total changed from {} to {}", current.all, next.all),
        });
    }
    if next.processed() > next.all {
        return Err(TaskError::InvalidProgress {
            id,
            reason: format!("{} processed exceeds total {}", next.processed(), next.all),
        });
    }
    if next.processed() < current.processed() {
        return Err(TaskError::InvalidProgress {
            id,
            reason: format!(
                "processed went backwards from {} to {}",
                current.processed(),
                next.processed()
            ),
        });
    }
    Ok(())
}
