//! Dispatcher: claim a batch of captures, then fan it out to comparators

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use snapwatch_core::comparator::ComparatorRegistry;
use snapwatch_core::errors::{ExError, ExErrorKind, Result};
use snapwatch_core::model::{BlobPointer, Capture, ComparisonPair, EntityRef};
use snapwatch_core::{log_op_end, log_op_error, log_op_start};
use snapwatch_core_types::{DispatchContext, RunId};
use snapwatch_store::capture::{
    claim_captures, fetch_capture, last_compared_capture, unprocessed_captures,
};
use snapwatch_store::db::with_immediate_tx;
use snapwatch_store::LedgerDb;

use super::gate::EntityGate;
use super::job::ProcessCaptureJob;
use super::report::{DispatchOutcome, FanOutReport};
use crate::queue::{panic_message, JobQueue, Priority};

/// Captures claimed by one dispatch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedBatch {
    pub entity: EntityRef,
    /// Every capture the claim marked compared, oldest first
    pub captures: Vec<Capture>,
    /// Newest compared capture before this batch
    pub previous: Option<Capture>,
    /// Newest capture of the batch ordered before `previous`
    pub stale: bool,
}

impl ClaimedBatch {
    /// Newest capture of the batch; its state is what gets compared
    pub fn newest(&self) -> Option<&Capture> {
        self.captures.last()
    }

    pub fn capture_ids(&self) -> Vec<i64> {
        self.captures.iter().map(|c| c.id).collect()
    }

    /// The `(old, new)` pointers handed to comparators
    pub fn pair(&self) -> ComparisonPair {
        ComparisonPair {
            entity: self.entity.clone(),
            old: self
                .previous
                .as_ref()
                .map(|c| c.pointer.clone())
                .unwrap_or_else(BlobPointer::empty),
            new: self
                .newest()
                .map(|c| c.pointer.clone())
                .unwrap_or_else(BlobPointer::empty),
        }
    }
}

/// Routes captures to comparators
///
/// Cheap to clone; clones share the registry, ledger, queue and entity
/// gate. Runs are only serialised per entity among clones of one
/// dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ComparatorRegistry>,
    ledger: LedgerDb,
    queue: Arc<dyn JobQueue>,
    priority: Priority,
    gate: Arc<EntityGate>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ComparatorRegistry>,
        ledger: LedgerDb,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            registry,
            ledger,
            queue,
            priority: Priority::Low,
            gate: Arc::new(EntityGate::new()),
        }
    }

    /// Priority dispatch runs are enqueued at (default `Low`)
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn registry(&self) -> &Arc<ComparatorRegistry> {
        &self.registry
    }

    pub fn ledger(&self) -> &LedgerDb {
        &self.ledger
    }

    pub(crate) fn gate(&self) -> &EntityGate {
        &self.gate
    }

    /// Entity a capture documents
    ///
    /// # Errors
    ///
    /// `NotFound` if the capture does not exist; persistence errors.
    pub fn capture_entity(&self, capture_id: i64) -> Result<EntityRef> {
        let conn = self.ledger.connect()?;
        fetch_capture(&conn, capture_id)?
            .map(|capture| capture.recordable)
            .ok_or_else(|| {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("process_capture")
                    .with_capture_id(capture_id)
                    .with_message(format!("capture {} does not exist", capture_id))
            })
    }

    /// True once a later batch than `batch` has been claimed for its entity
    ///
    /// # Errors
    ///
    /// Persistence errors.
    pub fn is_superseded(&self, batch: &ClaimedBatch) -> Result<bool> {
        let conn = self.ledger.connect()?;
        let latest = last_compared_capture(&conn, &batch.entity)?;
        Ok(match (latest, batch.newest()) {
            (Some(latest), Some(newest)) => latest.order_key() > newest.order_key(),
            _ => false,
        })
    }

    /// Called right after a capture row is written
    ///
    /// Enqueues a dispatch run if at least one comparator accepts the
    /// capture. Returns whether a run was enqueued.
    ///
    /// # Errors
    ///
    /// Queue errors (`QueueFull`, `QueueClosed`).
    pub fn handle_capture(&self, capture: &Capture) -> Result<bool> {
        let descriptor = capture.descriptor();
        if !self.registry.any_accepts(&descriptor) {
            tracing::debug!(
                capture_id = capture.id,
                recordable_type = %capture.recordable.kind,
                recordable_id = capture.recordable.id,
                "No comparator accepts capture"
            );
            return Ok(false);
        }

        let job = ProcessCaptureJob::new(self.clone(), capture.id);
        self.queue
            .enqueue(Arc::new(job), self.priority)
            .map_err(|e| e.with_capture_id(capture.id).with_entity(&capture.recordable))?;
        tracing::debug!(
            capture_id = capture.id,
            recordable_type = %capture.recordable.kind,
            recordable_id = capture.recordable.id,
            priority = ?self.priority,
            "Enqueued dispatch run"
        );
        Ok(true)
    }

    /// Claim and fan out in one go, holding the entity's gate throughout
    ///
    /// Safe to call again for the same capture: once the batch is claimed
    /// later calls return `AlreadyHandled`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown capture, claim errors, or `ComparatorFailed`
    /// naming the comparators that failed.
    pub fn process(&self, capture_id: i64) -> Result<DispatchOutcome> {
        let entity = self.capture_entity(capture_id)?;
        let context = DispatchContext::new();
        self.gate.with_entity(&entity, || {
            match self.claim(capture_id, &context)? {
                None => Ok(DispatchOutcome::AlreadyHandled),
                Some(batch) if batch.stale => Ok(DispatchOutcome::Stale),
                Some(batch) => self
                    .fan_out(&batch, &context)
                    .map(DispatchOutcome::Dispatched),
            }
        })
    }

    /// Select and claim the unprocessed batch of `capture_id`'s entity
    ///
    /// Runs in one `BEGIN IMMEDIATE` transaction: reload the capture, load
    /// the unprocessed captures and the last compared one, then mark the
    /// whole batch compared. Returns `None` if nothing was left to claim.
    /// Does not take the entity gate; `process` and the queued job do.
    ///
    /// # Errors
    ///
    /// `NotFound` if the capture does not exist; `Concurrency` if the claim
    /// did not cover exactly the rows that were read; persistence errors.
    pub fn claim(
        &self,
        capture_id: i64,
        context: &DispatchContext,
    ) -> Result<Option<ClaimedBatch>> {
        let start = Instant::now();
        log_op_start!(
            "claim_captures",
            capture_id,
            run_id = %context.run_id,
            attempt = context.attempt
        );

        let result = self.claim_inner(capture_id);
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(Some(batch)) => {
                if batch.stale {
                    tracing::warn!(
                        capture_id,
                        run_id = %context.run_id,
                        recordable_type = %batch.entity.kind,
                        recordable_id = batch.entity.id,
                        batch_len = batch.captures.len(),
                        "Stale batch claimed without comparing"
                    );
                }
                log_op_end!(
                    "claim_captures",
                    duration_ms = duration_ms,
                    capture_id,
                    run_id = %context.run_id,
                    batch_len = batch.captures.len()
                );
            }
            Ok(None) => {
                log_op_end!(
                    "claim_captures",
                    duration_ms = duration_ms,
                    capture_id,
                    run_id = %context.run_id,
                    batch_len = 0
                );
            }
            Err(err) => {
                log_op_error!(
                    "claim_captures",
                    err.clone(),
                    duration_ms = duration_ms,
                    capture_id,
                    run_id = %context.run_id
                );
            }
        }

        result.map_err(|e| {
            e.with_capture_id(capture_id)
                .with_run_id(context.run_id.clone())
        })
    }

    fn claim_inner(&self, capture_id: i64) -> Result<Option<ClaimedBatch>> {
        let mut conn = self.ledger.connect()?;
        with_immediate_tx(&mut conn, |tx| {
            let capture = fetch_capture(tx, capture_id)?.ok_or_else(|| {
                ExError::new(ExErrorKind::NotFound)
                    .with_op("claim_captures")
                    .with_message(format!("capture {} does not exist", capture_id))
            })?;
            let entity = capture.recordable;

            let captures = unprocessed_captures(tx, &entity)?;
            let Some(newest) = captures.last() else {
                return Ok(None);
            };
            let previous = last_compared_capture(tx, &entity)?;
            let stale = previous
                .as_ref()
                .map_or(false, |p| newest.order_key() < p.order_key());

            let claimed = claim_captures(tx, newest, Utc::now())?;
            if claimed != captures.len() {
                return Err(ExError::new(ExErrorKind::Concurrency)
                    .with_op("claim_captures")
                    .with_entity(&entity)
                    .with_message(format!(
                        "claimed {} rows but read {} unprocessed captures",
                        claimed,
                        captures.len()
                    )));
            }

            Ok(Some(ClaimedBatch {
                entity,
                captures,
                previous,
                stale,
            }))
        })
    }

    /// Invoke every accepting comparator with the batch's pair
    ///
    /// Comparators run one after another. A comparator that errors or panics
    /// does not stop its siblings and does not undo the claim.
    ///
    /// # Errors
    ///
    /// `ComparatorFailed` listing every comparator that failed, once all
    /// have run.
    pub fn fan_out(
        &self,
        batch: &ClaimedBatch,
        context: &DispatchContext,
    ) -> Result<FanOutReport> {
        let start = Instant::now();
        let Some(newest) = batch.newest() else {
            return Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("fan_out")
                .with_entity(&batch.entity)
                .with_message("batch holds no captures"));
        };
        let pair = batch.pair();
        log_op_start!(
            "fan_out",
            capture_id = newest.id,
            run_id = %context.run_id,
            attempt = context.attempt,
            recordable_type = %batch.entity.kind,
            recordable_id = batch.entity.id,
            batch_len = batch.captures.len()
        );

        let mut invoked = Vec::new();
        let mut failures = Vec::new();
        for comparator in self.registry.accepting(&newest.descriptor()) {
            let name = comparator.name().to_string();
            let outcome = catch_unwind(AssertUnwindSafe(|| comparator.compare(&pair)))
                .unwrap_or_else(|panic| {
                    Err(ExError::new(ExErrorKind::Internal)
                        .with_op("compare")
                        .with_message(format!(
                            "comparator panicked: {}",
                            panic_message(panic.as_ref())
                        )))
                });
            if let Err(err) = outcome {
                tracing::error!(
                    comparator = %name,
                    capture_id = newest.id,
                    run_id = %context.run_id,
                    attempt = context.attempt,
                    err.code = err.code(),
                    err.message = err.message(),
                    "Comparator failed"
                );
                failures.push(name.clone());
            }
            invoked.push(name);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        if !failures.is_empty() {
            let err = ExError::new(ExErrorKind::ComparatorFailed)
                .with_op("fan_out")
                .with_entity(&batch.entity)
                .with_capture_id(newest.id)
                .with_run_id(context.run_id.clone())
                .with_message(format!(
                    "{} of {} comparators failed",
                    failures.len(),
                    invoked.len()
                ))
                .with_failures(failures);
            log_op_error!(
                "fan_out",
                err.clone(),
                duration_ms = duration_ms,
                capture_id = newest.id,
                run_id = %context.run_id
            );
            return Err(err);
        }

        log_op_end!(
            "fan_out",
            duration_ms = duration_ms,
            capture_id = newest.id,
            run_id = %context.run_id,
            comparators = invoked.len()
        );

        Ok(FanOutReport {
            run_id: context.run_id.clone(),
            entity: batch.entity.clone(),
            pair,
            capture_ids: batch.capture_ids(),
            invoked,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("ledger", &self.ledger)
            .field("priority", &self.priority)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DeferredQueue;
    use snapwatch_core::model::{EntityKind, NewCapture};
    use snapwatch_store::capture::insert_capture;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (Dispatcher, TempDir) {
        let dir = TempDir::new().unwrap();
        let ledger = LedgerDb::new(dir.path().join("ledger.db"), Duration::from_secs(5));
        ledger.migrate().unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(ComparatorRegistry::new()),
            ledger,
            Arc::new(DeferredQueue::new()),
        );
        (dispatcher, dir)
    }

    #[test]
    fn test_claim_unknown_capture_is_not_found() {
        let (dispatcher, _dir) = setup();
        let err = dispatcher.claim(99, &DispatchContext::new()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.capture_id(), Some(99));
    }

    #[test]
    fn test_claim_with_no_comparators_still_claims() {
        let (dispatcher, _dir) = setup();
        let conn = dispatcher.ledger().connect().unwrap();
        let entity = EntityRef::new(EntityKind::Order, 3);
        let capture = insert_capture(
            &conn,
            &NewCapture::new(entity.clone(), BlobPointer::new("b", "Order/3", "v1")),
        )
        .unwrap();

        let batch = dispatcher
            .claim(capture.id, &DispatchContext::new())
            .unwrap()
            .unwrap();
        assert_eq!(batch.capture_ids(), vec![capture.id]);
        assert!(batch.pair().old.is_blank());

        let report = dispatcher.fan_out(&batch, &DispatchContext::new()).unwrap();
        assert!(report.invoked.is_empty());
        assert!(dispatcher
            .claim(capture.id, &DispatchContext::new())
            .unwrap()
            .is_none());
    }
}
