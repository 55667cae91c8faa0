//! Retry policy for remote calls
//!
//! Remote calls get a fixed number of attempts with a fixed pause between them.
//! After every successful call a courtesy delay is observed so consecutive
//! requests never hammer the platform. There is no jitter and no backoff growth.
//!
//! # Example
//!
//! ```no_run
//! use xhs_dl::retry::{IsRetryable, with_retry};
//! use xhs_dl::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig::default();
//! let result = with_retry(&config, || async {
//!     // Your remote call here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use std::future::Future;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, non-2xx answers) should return `true`.
/// Permanent failures (bad input, unparsable pages, local I/O) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // A request that could not even be built will fail the same way again
            Error::Network(e) => !e.is_builder(),
            Error::RemoteStatus { .. } => true,
            Error::Config { .. }
            | Error::Database(_)
            | Error::Resolution(_)
            | Error::Extraction(_)
            | Error::Walk(_)
            | Error::Task(_)
            | Error::Io(_)
            | Error::NotFound(_)
            | Error::ShuttingDown
            | Error::Cancelled
            | Error::ApiServerError(_)
            | Error::Other(_) => false,
        }
    }
}

/// Execute an async remote call under the retry policy
///
/// The operation is attempted at most `config.max_attempts` times (a ceiling of
/// zero still makes one attempt). Between failed attempts the policy sleeps for
/// `config.delay`; after a success it sleeps for `config.courtesy_delay` before
/// handing the result back.
///
/// Returns the successful result, the first non-retryable error, or the last
/// error once the ceiling is reached.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Remote call succeeded after retry");
                }
                if !config.courtesy_delay.is_zero() {
                    tokio::time::sleep(config.courtesy_delay).await;
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = config.delay.as_millis() as u64,
                    "Remote call failed, retrying"
                );
                tokio::time::sleep(config.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Remote call failed after all attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Remote call failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}
