#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{pointer, product, setup_test_env, Calls};
use snapwatch_core::comparator::Comparator;
use snapwatch_core::errors::ExError;
use snapwatch_core::model::{CaptureDescriptor, ComparisonPair, EntityKind, NewCapture};
use snapwatch_engine::DispatchOutcome;
use snapwatch_store::capture::{insert_capture, unprocessed_captures};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Records pairs; its first call signals `started` and then stalls
struct SlowFirst {
    calls: Calls,
    started: Arc<Barrier>,
    stalled: AtomicBool,
}

impl Comparator for SlowFirst {
    fn name(&self) -> &str {
        "slow_first"
    }
    fn accepts(&self, _capture: &CaptureDescriptor) -> bool {
        true
    }
    fn compare(&self, pair: &ComparisonPair) -> Result<(), ExError> {
        if !self.stalled.swap(true, Ordering::SeqCst) {
            self.started.wait();
            thread::sleep(Duration::from_millis(300));
        }
        self.calls.lock().unwrap().push(pair.clone());
        Ok(())
    }
}

#[test]
fn test_concurrent_process_claims_exactly_once() {
    // GIVEN five unprocessed captures of one entity
    let env = setup_test_env();
    let calls = env.record_calls(EntityKind::Product);
    let (dispatcher, _queue) = env.deferred();
    let captures: Vec<_> = (1..=5)
        .map(|t| env.capture(&product(1), t, &format!("v{}", t)))
        .collect();

    // WHEN eight runs race on the same entity
    let runs = 8;
    let barrier = Arc::new(Barrier::new(runs));
    let handles: Vec<_> = (0..runs)
        .map(|i| {
            let dispatcher = dispatcher.clone();
            let barrier = barrier.clone();
            let capture_id = captures[i % captures.len()].id;
            thread::spawn(move || {
                barrier.wait();
                dispatcher.process(capture_id).unwrap()
            })
        })
        .collect();
    let outcomes: Vec<DispatchOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    // THEN exactly one run claimed and compared the whole batch
    let dispatched: Vec<_> = outcomes.iter().filter_map(|o| o.report()).collect();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(
        dispatched[0].capture_ids,
        captures.iter().map(|c| c.id).collect::<Vec<_>>()
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == DispatchOutcome::AlreadyHandled)
            .count(),
        runs - 1
    );
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(captures.iter().all(|c| env.reload(c).is_compared()));
}

#[test]
fn test_duplicate_delivery_of_same_job_is_harmless() {
    let env = setup_test_env();
    let calls = env.record_calls(EntityKind::Product);
    let (dispatcher, queue) = env.deferred();

    let capture = env.capture(&product(1), 1, "v1");
    dispatcher.handle_capture(&capture).unwrap();
    dispatcher.handle_capture(&capture).unwrap();

    let jobs = queue.take_all();
    assert_eq!(jobs.len(), 2);
    let handles: Vec<_> = jobs
        .into_iter()
        .map(|job| thread::spawn(move || job.run()))
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[test]
fn test_interleaved_writes_never_skip_a_state() {
    // Captures keep arriving while runs happen; the chain of pairs must link
    // up without gaps: every call's old is the previous call's new.
    let env = setup_test_env();
    let calls = env.record_calls(EntityKind::Product);
    let (dispatcher, _queue) = env.deferred();

    let writer = {
        let env_ledger = env.ledger.clone();
        thread::spawn(move || {
            let conn = env_ledger.connect().unwrap();
            (1..=30)
                .map(|t| {
                    insert_capture(
                        &conn,
                        &NewCapture::new(product(1), common::pointer(&format!("v{}", t)))
                            .created_at(common::at(t)),
                    )
                    .unwrap()
                })
                .collect::<Vec<_>>()
        })
    };

    let worker = {
        let dispatcher = dispatcher.clone();
        let ledger = env.ledger.clone();
        thread::spawn(move || {
            for _ in 0..50 {
                let conn = ledger.connect().unwrap();
                let pending = unprocessed_captures(&conn, &product(1)).unwrap();
                drop(conn);
                if let Some(capture) = pending.first() {
                    dispatcher.process(capture.id).unwrap();
                }
                thread::yield_now();
            }
        })
    };

    let written = writer.join().unwrap();
    worker.join().unwrap();
    // drain whatever the worker did not get to
    dispatcher.process(written.last().unwrap().id).unwrap();

    let calls = calls.lock().unwrap();
    assert!(!calls.is_empty());
    assert!(calls[0].old.is_blank());
    for pair in calls.windows(2) {
        assert_eq!(pair[1].old, pair[0].new);
    }
    assert_eq!(calls.last().unwrap().new, common::pointer("v30"));
    assert!(written.iter().all(|c| env.reload(c).is_compared()));
}

#[test]
fn test_later_run_waits_for_in_flight_run_of_same_entity() {
    // GIVEN a run for c1 stalled inside its comparator
    let env = setup_test_env();
    let calls = Calls::default();
    let started = Arc::new(Barrier::new(2));
    env.registry
        .register(SlowFirst {
            calls: calls.clone(),
            started: started.clone(),
            stalled: AtomicBool::new(false),
        })
        .unwrap();
    let (dispatcher, _queue) = env.deferred();

    let c1 = env.capture(&product(1), 1, "v1");
    let first_run = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || dispatcher.process(c1.id).unwrap())
    };
    started.wait();

    // WHEN c2 lands and is processed while c1's pair is still being compared
    let c2 = env.capture(&product(1), 2, "v2");
    dispatcher.process(c2.id).unwrap();
    first_run.join().unwrap();

    // THEN (nil -> v1) was delivered before (v1 -> v2)
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2, "calls: {:?}", *calls);
    assert!(calls[0].old.is_blank());
    assert_eq!(calls[0].new, pointer("v1"));
    assert_eq!(calls[1].old, pointer("v1"));
    assert_eq!(calls[1].new, pointer("v2"));
}
