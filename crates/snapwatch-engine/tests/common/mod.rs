#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, TimeZone, Utc};
use snapwatch_core::comparator::{Comparator, ComparatorRegistry};
use snapwatch_core::errors::{ExError, ExErrorKind};
use snapwatch_core::model::{
    BlobPointer, Capture, CaptureDescriptor, ComparisonPair, EntityKind, EntityRef, NewCapture,
};
use snapwatch_engine::{DeferredQueue, Dispatcher, JobQueue};
use snapwatch_store::capture::{fetch_capture, insert_capture};
use snapwatch_store::LedgerDb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub type Calls = Arc<Mutex<Vec<ComparisonPair>>>;

/// Records every pair it is handed for one entity kind
pub struct Recording {
    pub kind: EntityKind,
    pub calls: Calls,
}

impl Comparator for Recording {
    fn name(&self) -> &str {
        "recording"
    }
    fn accepts(&self, capture: &CaptureDescriptor) -> bool {
        capture.recordable.kind == self.kind
    }
    fn compare(&self, pair: &ComparisonPair) -> Result<(), ExError> {
        self.calls.lock().unwrap().push(pair.clone());
        Ok(())
    }
}

/// Always fails
pub struct Failing;

impl Comparator for Failing {
    fn name(&self) -> &str {
        "failing"
    }
    fn accepts(&self, _capture: &CaptureDescriptor) -> bool {
        true
    }
    fn compare(&self, _pair: &ComparisonPair) -> Result<(), ExError> {
        Err(ExError::new(ExErrorKind::MissingBlob).with_message("blob went away"))
    }
}

/// Fails its first call only
#[derive(Default)]
pub struct FailsOnce {
    pub failed: AtomicBool,
}

impl Comparator for FailsOnce {
    fn name(&self) -> &str {
        "fails_once"
    }
    fn accepts(&self, _capture: &CaptureDescriptor) -> bool {
        true
    }
    fn compare(&self, _pair: &ComparisonPair) -> Result<(), ExError> {
        if self.failed.swap(true, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExError::new(ExErrorKind::Io).with_message("transient"))
        }
    }
}

/// Always panics
pub struct Panicking;

impl Comparator for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }
    fn accepts(&self, _capture: &CaptureDescriptor) -> bool {
        true
    }
    fn compare(&self, _pair: &ComparisonPair) -> Result<(), ExError> {
        panic!("comparator bug")
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub ledger: LedgerDb,
    pub registry: Arc<ComparatorRegistry>,
}

pub fn setup_test_env() -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let ledger = LedgerDb::new(dir.path().join("ledger.db"), Duration::from_secs(10));
    ledger.migrate().expect("migrations apply");
    TestEnv {
        dir,
        ledger,
        registry: Arc::new(ComparatorRegistry::new()),
    }
}

impl TestEnv {
    pub fn dispatcher(&self, queue: Arc<dyn JobQueue>) -> Dispatcher {
        Dispatcher::new(self.registry.clone(), self.ledger.clone(), queue)
    }

    pub fn deferred(&self) -> (Dispatcher, Arc<DeferredQueue>) {
        let queue = Arc::new(DeferredQueue::new());
        (self.dispatcher(queue.clone()), queue)
    }

    /// Register a recording comparator for `kind` and return its call log
    pub fn record_calls(&self, kind: EntityKind) -> Calls {
        let calls = Calls::default();
        self.registry
            .register(Recording {
                kind,
                calls: calls.clone(),
            })
            .unwrap();
        calls
    }

    /// Insert a capture of `entity` at `t` seconds with version `v<version>`
    pub fn capture(&self, entity: &EntityRef, t: i64, version: &str) -> Capture {
        let conn = self.ledger.connect().unwrap();
        insert_capture(
            &conn,
            &NewCapture::new(entity.clone(), BlobPointer::new("b1", "p1", version))
                .created_at(at(t)),
        )
        .unwrap()
    }

    pub fn reload(&self, capture: &Capture) -> Capture {
        let conn = self.ledger.connect().unwrap();
        fetch_capture(&conn, capture.id).unwrap().unwrap()
    }
}

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).single().unwrap()
}

pub fn product(id: i64) -> EntityRef {
    EntityRef::new(EntityKind::Product, id)
}

pub fn pointer(version: &str) -> BlobPointer {
    BlobPointer::new("b1", "p1", version)
}
