//! Error types for xhs-dl
//!
//! This module provides the error taxonomy for the library, including:
//! - Transient network failures (retried, see [`crate::retry`])
//! - Listing walk failures that carry partial progress ([`WalkError`])
//! - Task lifecycle violations ([`TaskError`])
//! - HTTP status code mapping for the REST API

use crate::types::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for xhs-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xhs-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "request.proxy")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Network-level failure (connect, timeout, reset)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-2xx status
    #[error("remote returned HTTP {status} for {url}")]
    RemoteStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Publisher link could not be resolved to a subject id
    #[error("profile resolution failed: {0}")]
    Resolution(String),

    /// Item page could not be turned into structured fields
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Listing walk failed
    #[error("listing walk failed: {0}")]
    Walk(#[from] WalkError),

    /// Task lifecycle violation
    #[error("task error: {0}")]
    Task(#[from] TaskError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Work was cancelled before it finished
    #[error("task cancelled")]
    Cancelled,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Failures of a single listing walk.
///
/// Accumulated URLs are discarded on failure, only their count survives so the
/// owning task can report how far the walk got.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    /// A page request exhausted its retry budget
    #[error("page {page} could not be fetched after {collected} links were collected: {reason}")]
    PageFetch {
        /// 1-based page number that failed
        page: usize,
        /// Unique links accumulated before the failure
        collected: usize,
        /// Last error reported by the remote call
        reason: String,
    },

    /// The walk was cancelled between pages
    #[error("walk cancelled after {collected} links were collected")]
    Cancelled {
        /// Unique links accumulated before cancellation
        collected: usize,
    },
}

impl WalkError {
    /// Number of unique links the walk had accumulated when it stopped
    pub fn collected(&self) -> usize {
        match self {
            WalkError::PageFetch { collected, .. } | WalkError::Cancelled { collected } => {
                *collected
            }
        }
    }
}

/// Task lifecycle violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// No task registered under this id
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Operation not allowed in the task's current state
    #[error("cannot {operation} task {id} in state {current}")]
    InvalidTransition {
        /// Task id
        id: TaskId,
        /// Attempted operation (e.g., "mark_running")
        operation: &'static str,
        /// State that rejected the operation
        current: TaskStatus,
    },

    /// Progress snapshot would break the statistics invariants
    #[error("rejected progress for task {id}: {reason}")]
    InvalidProgress {
        /// Task id
        id: TaskId,
        /// Which invariant was violated
        reason: String,
    },
}

/// API error response format
///
/// ```json
/// {
///   "error": {
///     "code": "not_found",
///     "message": "task 3f0c… not found"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            Error::Config { .. } => 400,
            Error::Resolution(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Task(TaskError::NotFound(_)) => 404,

            // 409 Conflict
            Error::Task(TaskError::InvalidTransition { .. }) => 409,
            Error::Task(TaskError::InvalidProgress { .. }) => 409,
            Error::Cancelled => 409,

            // 422 Unprocessable Entity
            Error::Extraction(_) => 422,

            // 500 Internal Server Error
            Error::Database(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - remote platform failures
            Error::Network(_) => 502,
            Error::RemoteStatus { .. } => 502,
            Error::Walk(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Network(_) => "network_error",
            Error::RemoteStatus { .. } => "remote_error",
            Error::Resolution(_) => "resolution_error",
            Error::Extraction(_) => "extraction_error",
            Error::Walk(_) => "walk_error",
            Error::Task(e) => match e {
                TaskError::NotFound(_) => "not_found",
                TaskError::InvalidTransition { .. } => "invalid_state",
                TaskError::InvalidProgress { .. } => "invalid_progress",
            },
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Cancelled => "cancelled",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Task(TaskError::NotFound(id)) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::Task(TaskError::InvalidTransition {
                id,
                operation,
                current,
            }) => Some(serde_json::json!({
                "task_id": id,
                "operation": operation,
                "current_state": current,
            })),
            Error::RemoteStatus { status, url } => Some(serde_json::json!({
                "status": status,
                "url": url,
            })),
            Error::Walk(walk) => Some(serde_json::json!({
                "collected": walk.collected(),
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
