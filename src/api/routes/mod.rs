//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`tasks`] - Batch task submission, status and cancellation
//! - [`system`] - Health, events, OpenAPI

use crate::types::TaskId;
use serde::{Deserialize, Serialize};

mod system;
mod tasks;

pub use system::*;
pub use tasks::*;

/// Response for the task creation endpoints
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct TaskCreatedResponse {
    /// Human-readable confirmation
    pub message: String,
    /// Identifier to poll
    pub task_id: TaskId,
    /// Relative URL of the task status document
    pub status_url: String,
}
