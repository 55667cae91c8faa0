//! Batch task execution
//!
//! A batch task resolves the publisher, walks the listing for item links and
//! then handles the links strictly one after another:
//!
//! 1. derive the item id from the link
//! 2. skip it if the record store already knows it
//! 3. fetch and parse the item page
//! 4. drop it if the task only wants videos and this is not one
//! 5. download its media and record it
//!
//! A failure while handling one item counts against that item only. Only
//! resolution, walk and store failures end the task early.
//!
//! Counters are recomputed as a running tally and pushed to the
//! [`TaskStore`] as a full snapshot after every item.


use crate::config::Config;
use crate::error::{Error, Result, WalkError};
use crate::remote::{NoteExtractor, RecordStore, Session};
use crate::retry::with_retry;
use crate::tasks::TaskStore;
use crate::types::{ContentType, ListingMode, Statistics, TaskId};
use crate::walker::{PageWalker, note_id_from_link};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a batch task needs to know about its request
#[derive(Clone, Debug)]
pub struct BatchJob {
    /// Task the job reports to
    pub task_id: TaskId,
    /// Listing to walk
    pub mode: ListingMode,
    /// Publisher link as submitted
    pub profile_url: String,
    /// Maximum number of links to process
    pub limit: Option<usize>,
    /// Only download video items
    pub video_only: bool,
}

/// How a single link was handled
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Media downloaded and recorded
    Downloaded,
    /// Already in the record store
    Skipped,
    /// Excluded by the content filter
    Filtered,
    /// Could not be handled; the message goes to the task's error log
    Failed(String),
}

impl ItemOutcome {
    fn tally(&self, stats: &mut Statistics) {
        match self {
            ItemOutcome::Downloaded => stats.success += 1,
            ItemOutcome::Skipped => stats.skip += 1,
            ItemOutcome::Filtered => stats.filtered += 1,
            ItemOutcome::Failed(_) => stats.fail += 1,
        }
    }
}

/// A reason the whole task stopped, with the counters at that moment
struct JobFailure {
    reason: String,
    stats: Statistics,
}

/// Runs batch jobs against the shared task store, extractor and record store
#[derive(Clone)]
pub struct PipelineRunner {
    config: Arc<Config>,
    tasks: Arc<TaskStore>,
    extractor: Arc<dyn NoteExtractor>,
    records: Arc<dyn RecordStore>,
}

impl PipelineRunner {
    /// Create a runner
    pub fn new(
        config: Arc<Config>,
        tasks: Arc<TaskStore>,
        extractor: Arc<dyn NoteExtractor>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            tasks,
            extractor,
            records,
        }
    }

    /// Drive `job` to a terminal state
    ///
    /// The task ends `completed` with the final counters, or `failed` with the
    /// reason appended to its errors and the counters accumulated so far.
    pub async fn run(&self, job: BatchJob, session: Session, cancel: CancellationToken) {
        let id = job.task_id;

        match self.drive(&job, &session, &cancel).await {
            Ok(summary) => {
                if let Err(e) = self.tasks.complete(id, summary).await {
                    tracing::error!(task_id = %id, error = %e, "Failed to complete task");
                }
            }
            Err(failure) => {
                if let Err(e) = self.tasks.fail(id, failure.reason, failure.stats).await {
                    tracing::error!(task_id = %id, error = %e, "Failed to mark task failed");
                }
            }
        }
    }

    async fn drive(
        &self,
        job: &BatchJob,
        session: &Session,
        cancel: &CancellationToken,
    ) -> std::result::Result<Statistics, JobFailure> {
        let id = job.task_id;
        let cancelled = |stats: Statistics| JobFailure {
            reason: Error::Cancelled.to_string(),
            stats,
        };

        if cancel.is_cancelled() {
            return Err(cancelled(Statistics::default()));
        }

        let subject_id = session
            .resolver
            .resolve(&job.profile_url)
            .await
            .map_err(|e| JobFailure {
                reason: e.to_string(),
                stats: Statistics::default(),
            })?;
        tracing::info!(task_id = %id, mode = %job.mode, subject_id = %subject_id, "Publisher resolved");

        let walker = PageWalker::new(session.listing.clone(), &self.config);
        let links = walker
            .run(job.mode, &subject_id, job.limit, cancel)
            .await
            .map_err(|e| match e {
                WalkError::Cancelled { collected } => {
                    tracing::info!(task_id = %id, collected, "Task cancelled during listing walk");
                    cancelled(Statistics::with_total(collected as u64))
                }
                e => JobFailure {
                    stats: Statistics::with_total(e.collected() as u64),
                    reason: Error::Walk(e).to_string(),
                },
            })?;

        let mut stats = Statistics::with_total(links.len() as u64);
        self.tasks
            .mark_running(id, stats.all)
            .await
            .map_err(|e| JobFailure {
                reason: e.to_string(),
                stats,
            })?;

        for link in &links {
            if cancel.is_cancelled() {
                tracing::info!(task_id = %id, processed = stats.processed(), "Task cancelled between items");
                return Err(cancelled(stats));
            }

            let outcome = self.process_item(link, job.video_only, session).await;
            outcome.tally(&mut stats);

            if let ItemOutcome::Failed(message) = &outcome {
                tracing::warn!(task_id = %id, link = %link, error = %message, "Item failed");
                self.tasks
                    .add_error(id, message.clone())
                    .await
                    .map_err(|e| JobFailure {
                        reason: e.to_string(),
                        stats,
                    })?;
            }

            self.tasks
                .update_progress(id, stats)
                .await
                .map_err(|e| JobFailure {
                    reason: e.to_string(),
                    stats,
                })?;
        }

        Ok(stats)
    }

    /// Handle one link; never fails, every problem becomes [`ItemOutcome::Failed`]
    pub async fn process_item(&self, link: &str, video_only: bool, session: &Session) -> ItemOutcome {
        let Some(note_id) = note_id_from_link(link) else {
            return ItemOutcome::Failed(format!("{link}: no item id in link"));
        };

        match self.try_process(&note_id, link, video_only, session).await {
            Ok(outcome) => outcome,
            Err(e) => ItemOutcome::Failed(format!("{note_id}: {e}")),
        }
    }

    async fn try_process(
        &self,
        note_id: &str,
        link: &str,
        video_only: bool,
        session: &Session,
    ) -> Result<ItemOutcome> {
        if self.records.exists(note_id).await? {
            tracing::debug!(note_id, "Item already downloaded, skipping");
            return Ok(ItemOutcome::Skipped);
        }

        let page = with_retry(&self.config.retry, || session.detail.fetch_detail(link)).await?;
        let detail = self.extractor.parse(&page)?;

        if video_only && detail.content_type != ContentType::Video {
            tracing::debug!(note_id, content_type = ?detail.content_type, "Item filtered out");
            return Ok(ItemOutcome::Filtered);
        }

        let urls = detail.download_urls();
        if urls.is_empty() {
            return Ok(ItemOutcome::Failed(format!(
                "{note_id}: no downloadable media found"
            )));
        }

        let results = session.media.download(&urls, &detail.meta()).await?;
        let saved = results.iter().filter(|ok| **ok).count();
        if results.is_empty() || saved < urls.len() {
            return Ok(ItemOutcome::Failed(format!(
                "{note_id}: {saved} of {} media files downloaded",
                urls.len()
            )));
        }

        self.records.record(note_id).await?;
        tracing::info!(note_id, files = saved, "Item downloaded");
        Ok(ItemOutcome::Downloaded)
    }
}
