//! # xhs-dl
//!
//! Batch media downloader library for Xiaohongshu listings.
//!
//! A batch task walks one of three listings (a publisher's posts, the caller's
//! liked items or saved items), then downloads the media of every discovered
//! item one after another, skipping items already recorded as downloaded.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - the REST API is an embeddable `axum` router
//! - **Pluggable** - every remote touch point sits behind a trait in [`remote`]
//! - **Event-driven** - task transitions are broadcast as [`Event`]s
//!
//! ## Quick Start
//!
//! ```no_run
//! use xhs_dl::{BatchDownloader, BatchRequest, Config, ListingMode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = BatchDownloader::new(Config::default()).await?;
//!
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task_id = downloader
//!         .create_task(
//!             ListingMode::Posted,
//!             BatchRequest {
//!                 profile_url: "https://www.xiaohongshu.com/user/profile/5f0c...".into(),
//!                 ..Default::default()
//!             },
//!         )
//!         .await?;
//!     println!("status: {:?}", downloader.task(task_id).await?.status);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Batch downloader context (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Tolerant key-path lookup over JSON values
pub mod lookup;
/// Batch task execution
pub mod pipeline;
/// Remote collaborators and their HTTP implementations
pub mod remote;
/// Retry logic with fixed attempts and pacing
pub mod retry;
/// Task registry and lifecycle state machine
pub mod tasks;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Cursor-paginated listing walker
pub mod walker;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction};
pub use db::Database;
pub use downloader::{BatchDownloader, Collaborators};
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, Result, TaskError, ToHttpStatus, WalkError,
};
pub use pipeline::{BatchJob, ItemOutcome, PipelineRunner};
pub use remote::{
    DetailSource, MediaDownloader, NoteExtractor, ProfileResolver, RecordStore, RequestSigner,
    Session, SessionFactory,
};
pub use tasks::TaskStore;
pub use types::{
    BatchRequest, ContentType, Event, ItemMeta, ListingMode, NoteDetail, SessionOptions,
    Statistics, Task, TaskId, TaskStatus,
};
pub use walker::{ListingSource, PageRequest, PageWalker};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use xhs_dl::{BatchDownloader, Config, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = BatchDownloader::new(Config::default()).await?;
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: BatchDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
