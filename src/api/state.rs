//! Application state for the API server

use crate::{BatchDownloader, Config};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The batch downloader context
    pub downloader: Arc<BatchDownloader>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<BatchDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
