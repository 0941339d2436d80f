//! Queue that holds jobs until they are explicitly drained

use super::{Job, JobQueue, Priority};
use snapwatch_core::errors::Result;
use std::sync::{Arc, Mutex};

/// Collects jobs without running them
///
/// Lets callers decide when (and how many times, and from which threads) each
/// job runs, e.g. to deliver the same dispatch run twice.
#[derive(Default)]
pub struct DeferredQueue {
    jobs: Mutex<Vec<(Arc<dyn Job>, Priority)>>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels of the held jobs in enqueue order
    pub fn labels(&self) -> Vec<String> {
        self.jobs
            .lock()
            .map(|jobs| jobs.iter().map(|(job, _)| job.label()).collect())
            .unwrap_or_default()
    }

    /// Remove and return every held job, highest priority first, then in
    /// enqueue order
    pub fn take_all(&self) -> Vec<Arc<dyn Job>> {
        let mut jobs = std::mem::take(&mut *self.jobs.lock().unwrap_or_else(|e| e.into_inner()));
        jobs.sort_by_key(|(_, priority)| *priority as u8);
        jobs.into_iter().map(|(job, _)| job).collect()
    }

    /// Run every held job once on this thread
    pub fn run_all(&self) -> Vec<Result<()>> {
        self.take_all().iter().map(|job| job.run()).collect()
    }
}

impl JobQueue for DeferredQueue {
    fn enqueue(&self, job: Arc<dyn Job>, priority: Priority) -> Result<()> {
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((job, priority));
        Ok(())
    }
}

impl std::fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("jobs", &self.labels())
            .finish()
    }
}
