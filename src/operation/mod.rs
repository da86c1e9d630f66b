//! Waiting for long-running compute operations.
//!
//! Create and delete calls return an [`Operation`] handle immediately. The
//! [`OperationWaiter`] polls the handle until it reaches `DONE`, then turns
//! any embedded provider error into [`WaitError::OperationFailed`]. The wait
//! is bounded by a maximum duration and by the number of consecutive polling
//! failures it tolerates.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::compute::{ComputeApi, ComputeError, Operation};

/// Default delay between operation polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default upper bound on how long a single operation is awaited.
pub const MAX_WAIT: Duration = Duration::from_secs(600);
/// Default number of consecutive polling failures before giving up.
pub const MAX_POLL_FAILURES: u32 = 3;

/// Timing limits applied by [`OperationWaiter`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitPolicy {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Maximum time spent waiting for one operation.
    pub max_wait: Duration,
    /// Consecutive `getOperation` failures after which the wait is abandoned.
    pub max_poll_failures: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            max_wait: MAX_WAIT,
            max_poll_failures: MAX_POLL_FAILURES,
        }
    }
}

/// Errors raised while waiting for an operation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WaitError {
    /// The operation finished with an embedded provider error.
    #[error("operation {operation} failed with {code}{}", message_suffix(.message.as_deref()))]
    OperationFailed {
        /// Operation name.
        operation: String,
        /// First error code reported by the provider.
        code: String,
        /// Message attached to the first error, when present.
        message: Option<String>,
    },
    /// The operation did not finish within the configured maximum wait.
    #[error("timed out after {}s waiting for operation {operation}", .waited.as_secs())]
    TimedOut {
        /// Operation name.
        operation: String,
        /// Time spent waiting.
        waited: Duration,
    },
    /// Polling the operation kept failing.
    #[error("could not poll operation {operation}: {source}")]
    Provider {
        /// Operation name.
        operation: String,
        /// Last polling error.
        #[source]
        source: ComputeError,
    },
}

fn message_suffix(message: Option<&str>) -> String {
    message.map_or_else(String::new, |text| format!(": {text}"))
}

/// Polls zonal operations until they reach a terminal state.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OperationWaiter {
    policy: WaitPolicy,
}

impl OperationWaiter {
    /// Creates a waiter with the given limits.
    #[must_use]
    pub const fn new(policy: WaitPolicy) -> Self {
        Self { policy }
    }

    /// Returns the limits applied by this waiter.
    #[must_use]
    pub const fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Blocks until `operation` is `DONE`, returning the finished operation.
    ///
    /// A handle that is already `DONE` is inspected without polling.
    ///
    /// # Errors
    ///
    /// Returns [`WaitError::OperationFailed`] when the finished operation
    /// carries an error, [`WaitError::TimedOut`] when the maximum wait
    /// elapses, and [`WaitError::Provider`] after too many consecutive
    /// polling failures.
    pub async fn wait<A>(
        &self,
        api: &A,
        project: &str,
        zone: &str,
        operation: Operation,
    ) -> Result<Operation, WaitError>
    where
        A: ComputeApi + ?Sized,
    {
        let started = Instant::now();
        let deadline = started + self.policy.max_wait;
        let mut current = operation;
        let mut consecutive_failures = 0_u32;

        loop {
            if current.status.is_done() {
                return Self::finish(current);
            }
            if Instant::now() >= deadline {
                return Err(WaitError::TimedOut {
                    operation: current.name,
                    waited: started.elapsed(),
                });
            }

            match api.get_operation(project, zone, &current.name).await {
                Ok(next) => {
                    consecutive_failures = 0;
                    debug!(operation = %next.name, status = ?next.status, zone, "polled operation");
                    current = next;
                    if current.status.is_done() {
                        continue;
                    }
                }
                Err(err) => {
                    consecutive_failures += 1;
                    warn!(
                        operation = %current.name,
                        zone,
                        attempt = consecutive_failures,
                        error = %err,
                        "failed to poll operation"
                    );
                    if consecutive_failures >= self.policy.max_poll_failures {
                        return Err(WaitError::Provider {
                            operation: current.name,
                            source: err,
                        });
                    }
                }
            }

            sleep(self.policy.poll_interval).await;
        }
    }

    fn finish(operation: Operation) -> Result<Operation, WaitError> {
        match operation.first_error() {
            Some(detail) => Err(WaitError::OperationFailed {
                operation: operation.name.clone(),
                code: detail.code.clone(),
                message: detail.message.clone(),
            }),
            None => Ok(operation),
        }
    }
}
