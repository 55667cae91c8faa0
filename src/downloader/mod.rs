//! Batch downloader context split into focused submodules.
//!
//! The `BatchDownloader` struct and its methods are organized by domain:
//! - [`control`] - Task creation, queries and cancellation
//! - [`lifecycle`] - Shutdown coordination
//! - [`services`] - Background service starters (retention sweeper)

mod control;
mod lifecycle;
mod services;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::pipeline::PipelineRunner;
use crate::remote::{
    HttpSessionFactory, InitialStateExtractor, NoteExtractor, RecordStore, SessionFactory,
};
use crate::tasks::TaskStore;
use crate::types::{Event, TaskId};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

/// The pluggable pieces a [`BatchDownloader`] runs tasks against
#[derive(Clone)]
pub struct Collaborators {
    /// Opens per-task remote sessions (listing, detail, resolution, media)
    pub sessions: Arc<dyn SessionFactory>,
    /// Turns item pages into structured fields
    pub extractor: Arc<dyn NoteExtractor>,
    /// Ledger of already downloaded items
    pub records: Arc<dyn RecordStore>,
}

/// Running task state
#[derive(Clone)]
pub(crate) struct JobState {
    /// Cancellation tokens of tasks whose driver is still running
    pub(crate) active: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
    /// Flag to indicate whether new tasks are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Tripped at the end of shutdown to stop background services
    pub(crate) shutdown: CancellationToken,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct BatchDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Task registry
    pub(crate) tasks: Arc<TaskStore>,
    /// Per-task session factory
    pub(crate) sessions: Arc<dyn SessionFactory>,
    /// Job driver shared by every task
    pub(crate) runner: PipelineRunner,
    /// Running task state
    pub(crate) jobs: JobState,
}

impl BatchDownloader {
    /// Create a downloader with the default HTTP collaborators
    ///
    /// This initializes:
    /// - the download directory
    /// - the SQLite record store (running migrations)
    /// - the HTTP session factory and page extractor
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let db = Database::new(&config.persistence.database_path).await?;
        let config = Arc::new(config);

        let collaborators = Collaborators {
            sessions: Arc::new(HttpSessionFactory::new(config.clone())?),
            extractor: Arc::new(InitialStateExtractor::new()?),
            records: Arc::new(db),
        };

        Ok(Self::with_collaborators(config, collaborators))
    }

    /// Create a downloader around caller-supplied collaborators
    pub fn with_collaborators(config: Arc<Config>, collaborators: Collaborators) -> Self {
        // Buffer of 1000 events per subscriber before it lags
        let (event_tx, _rx) = broadcast::channel(1000);
        let tasks = Arc::new(TaskStore::new(event_tx.clone()));

        let runner = PipelineRunner::new(
            config.clone(),
            tasks.clone(),
            collaborators.extractor,
            collaborators.records,
        );

        Self {
            event_tx,
            config,
            tasks,
            sessions: collaborators.sessions,
            runner,
            jobs: JobState {
                active: Arc::new(Mutex::new(HashMap::new())),
                accepting_new: Arc::new(AtomicBool::new(true)),
                shutdown: CancellationToken::new(),
            },
        }
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives `RecvError::Lagged`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use xhs_dl::{BatchDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = BatchDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "task event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address (default: 127.0.0.1:5556).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
