//! The queued form of a dispatch run

use std::sync::Mutex;

use snapwatch_core::errors::Result;
use snapwatch_core_types::DispatchContext;

use super::dispatcher::{ClaimedBatch, Dispatcher};
use crate::queue::Job;

#[derive(Debug)]
enum RunState {
    Pending,
    /// Claimed; retries fan the same batch out again
    Claimed(ClaimedBatch),
    /// Nothing to compare (already handled or stale)
    Done,
}

/// Dispatch run for one capture
///
/// The first `run` claims the batch. If fan-out then fails, the job keeps the
/// claimed batch, so the next `run` invokes every accepting comparator again
/// for that same batch, including the ones that already succeeded. Each `run`
/// holds the entity's gate. A retry whose batch was overtaken by a later
/// claim is dropped, so no pair is delivered after a newer one.
#[derive(Debug)]
pub struct ProcessCaptureJob {
    dispatcher: Dispatcher,
    capture_id: i64,
    state: Mutex<(RunState, DispatchContext)>,
}

impl ProcessCaptureJob {
    pub fn new(dispatcher: Dispatcher, capture_id: i64) -> Self {
        Self {
            dispatcher,
            capture_id,
            state: Mutex::new((RunState::Pending, DispatchContext::new())),
        }
    }

    pub fn capture_id(&self) -> i64 {
        self.capture_id
    }

    /// The batch this job claimed, if it has claimed one
    pub fn claimed_batch(&self) -> Option<ClaimedBatch> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &state.0 {
            RunState::Claimed(batch) => Some(batch.clone()),
            _ => None,
        }
    }
}

impl Job for ProcessCaptureJob {
    fn label(&self) -> String {
        format!("process_capture:{}", self.capture_id)
    }

    fn run(&self) -> Result<()> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let (state, context) = &mut *guard;

        let entity = match state {
            RunState::Done => return Ok(()),
            RunState::Claimed(batch) => batch.entity.clone(),
            RunState::Pending => self.dispatcher.capture_entity(self.capture_id)?,
        };

        self.dispatcher.gate().with_entity(&entity, || {
            if matches!(state, RunState::Pending) {
                *state = match self.dispatcher.claim(self.capture_id, context)? {
                    Some(batch) if !batch.stale => RunState::Claimed(batch),
                    _ => RunState::Done,
                };
            } else {
                *context = context.next_attempt();
            }

            let RunState::Claimed(batch) = &*state else {
                return Ok(());
            };
            if context.attempt > 1 && self.dispatcher.is_superseded(batch)? {
                tracing::warn!(
                    capture_id = self.capture_id,
                    run_id = %context.run_id,
                    attempt = context.attempt,
                    recordable_type = %entity.kind,
                    recordable_id = entity.id,
                    "Retry dropped: a later batch was already compared"
                );
                *state = RunState::Done;
                return Ok(());
            }
            self.dispatcher.fan_out(batch, context).map(|_| ())
        })
    }
}
