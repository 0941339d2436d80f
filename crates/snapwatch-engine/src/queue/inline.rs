//! Queue that runs jobs on the enqueuing thread

use super::{run_with_retries, Job, JobFailure, JobQueue, Priority};
use snapwatch_core::errors::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

/// Runs every job immediately, retrying retryable failures
///
/// A job that still fails after `max_attempts` is logged and recorded in
/// `failures()`; `enqueue` itself still succeeds, as the job was accepted.
///
/// A job enqueued from inside a running job (a comparator recording a new
/// capture) is queued behind it on the same thread and runs once the outer
/// job returns.
pub struct InlineQueue {
    max_attempts: u32,
    failures: Mutex<Vec<JobFailure>>,
    /// Threads currently running jobs, with the jobs they enqueued meanwhile
    backlogs: Mutex<HashMap<ThreadId, VecDeque<Arc<dyn Job>>>>,
}

impl std::fmt::Debug for InlineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineQueue")
            .field("max_attempts", &self.max_attempts)
            .field("failures", &self.failures().len())
            .finish()
    }
}

impl InlineQueue {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failures: Mutex::new(Vec::new()),
            backlogs: Mutex::new(HashMap::new()),
        }
    }

    fn backlogs(&self) -> MutexGuard<'_, HashMap<ThreadId, VecDeque<Arc<dyn Job>>>> {
        self.backlogs.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn execute(&self, job: &dyn Job) {
        let (attempts, result) = run_with_retries(job, self.max_attempts, Duration::ZERO);
        if let Err(error) = result {
            tracing::error!(
                job = %job.label(),
                attempts,
                err.code = error.code(),
                err.message = error.message(),
                "Job failed"
            );
            self.failures
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(JobFailure {
                    label: job.label(),
                    attempts,
                    error,
                });
        }
    }

    /// Jobs that exhausted their attempts, oldest first
    pub fn failures(&self) -> Vec<JobFailure> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl Default for InlineQueue {
    fn default() -> Self {
        Self::new(1)
    }
}

impl JobQueue for InlineQueue {
    fn enqueue(&self, job: Arc<dyn Job>, _priority: Priority) -> Result<()> {
        let me = thread::current().id();
        {
            let mut backlogs = self.backlogs();
            if let Some(backlog) = backlogs.get_mut(&me) {
                backlog.push_back(job);
                return Ok(());
            }
            backlogs.insert(me, VecDeque::new());
        }

        let mut next = Some(job);
        while let Some(job) = next {
            self.execute(job.as_ref());
            next = self.backlogs().get_mut(&me).and_then(VecDeque::pop_front);
        }
        self.backlogs().remove(&me);
        Ok(())
    }
}
