//! Background job queues
//!
//! Dispatch runs are handed to a `JobQueue` so the mutation path never waits
//! on comparators. Three implementations:
//!
//! - `InlineQueue`: runs each job immediately on the caller's thread
//! - `DeferredQueue`: holds jobs until the caller drains them
//! - `WorkerPool`: bounded channels drained by named worker threads

mod deferred;
mod inline;
mod pool;

pub use deferred::DeferredQueue;
pub use inline::InlineQueue;
pub use pool::{PoolStats, WorkerPool, WorkerPoolConfig};

use serde::Deserialize;
use snapwatch_core::errors::{ExError, ExErrorKind, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Scheduling priority of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Normal,
    /// Non-latency-critical background work; dispatch runs default here
    #[default]
    Low,
}

/// A unit of background work
///
/// `run` may be called again after it returns a retryable error, so it must
/// be safe to repeat.
pub trait Job: Send + Sync {
    fn label(&self) -> String;

    fn run(&self) -> Result<()>;
}

/// Somewhere to put jobs
pub trait JobQueue: Send + Sync {
    /// # Errors
    ///
    /// `QueueFull` / `QueueClosed` when the queue cannot accept the job.
    fn enqueue(&self, job: Arc<dyn Job>, priority: Priority) -> Result<()>;
}

/// A job that exhausted its attempts
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub label: String,
    pub attempts: u32,
    pub error: ExError,
}

/// Run `job` until it succeeds, fails with a non-retryable error, or uses up
/// `max_attempts`. Panics count as non-retryable `Internal` failures.
///
/// Returns the number of attempts made alongside the final result.
pub(crate) fn run_with_retries(
    job: &dyn Job,
    max_attempts: u32,
    backoff: Duration,
) -> (u32, Result<()>) {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match catch_unwind(AssertUnwindSafe(|| job.run())) {
            Ok(result) => result,
            Err(panic) => Err(ExError::new(ExErrorKind::Internal)
                .with_op("run_job")
                .with_message(format!("job panicked: {}", panic_message(panic.as_ref())))),
        };

        match result {
            Ok(()) => return (attempt, Ok(())),
            Err(err) if err.kind().is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    job = %job.label(),
                    attempt,
                    max_attempts,
                    err.code = err.code(),
                    "Job failed, retrying"
                );
                if !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
                attempt += 1;
            }
            Err(err) => return (attempt, Err(err)),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
