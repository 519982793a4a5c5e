//! Bounded consecutive-failure retry of a single chunk.

use std::future::Future;

use tracing::{error, warn};

use crate::error::{BulkError, Result};

/// Default bound on consecutive failures of one chunk.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Retry controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    Attempting,
    Succeeded,
    ExhaustedFailure,
}

/// Re-attempts the same chunk immediately while failures stay within the bound.
///
/// The consecutive-error counter resets on every success. Once it exceeds
/// `max_consecutive_errors` the controller is exhausted and the last cause
/// is returned wrapped in [`BulkError::ExhaustedRetry`]. Errors that are not
/// retryable (see [`BulkError::is_retryable`]) end the dispatch at once.
#[derive(Debug)]
pub struct RetryController {
    max_consecutive_errors: u32,
    consecutive_errors: u32,
    total_retries: u32,
    state: RetryState,
}

impl RetryController {
    pub fn new(max_consecutive_errors: u32) -> Self {
        Self {
            max_consecutive_errors,
            consecutive_errors: 0,
            total_retries: 0,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Re-attempts made over the controller's lifetime.
    pub fn total_retries(&self) -> u32 {
        self.total_retries
    }

    /// Run `attempt` until it succeeds or the failure bound is exceeded.
    pub async fn dispatch<T, F, Fut>(&mut self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.state = RetryState::Attempting;

        loop {
            match attempt().await {
                Ok(value) => {
                    self.consecutive_errors = 0;
                    self.state = RetryState::Succeeded;
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    self.state = RetryState::ExhaustedFailure;
                    return Err(e);
                }
                Err(e) => {
                    self.consecutive_errors += 1;

                    if self.consecutive_errors <= self.max_consecutive_errors {
                        self.total_retries += 1;
                        warn!(
                            "{}: attempt failed ({}/{} consecutive errors), retrying: {}",
                            operation, self.consecutive_errors, self.max_consecutive_errors, e
                        );
                        continue;
                    }

                    error!(
                        "{}: giving up after {} consecutive errors: {}",
                        operation, self.consecutive_errors, e
                    );
                    self.state = RetryState::ExhaustedFailure;
                    return Err(BulkError::ExhaustedRetry {
                        operation: operation.to_string(),
                        attempts: self.consecutive_errors,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(MAX_CONSECUTIVE_ERRORS)
    }
}
