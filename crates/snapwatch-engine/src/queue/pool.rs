//! Worker pool backed by bounded crossbeam channels
//!
//! High and Normal jobs share the foreground channel; Low jobs go to the
//! background channel. Workers always take a waiting foreground job before a
//! background one, so dispatch runs never delay latency-sensitive work.

use super::{run_with_retries, Job, JobQueue, Priority};
use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use snapwatch_core::errors::{ExError, ExErrorKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Worker pool sizing and retry policy
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub name: String,
    pub threads: usize,
    /// Capacity of each channel
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "snapwatch".to_string(),
            threads: 2,
            queue_capacity: 1024,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Counters since the pool started
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub completed: u64,
    pub failed: u64,
    pub attempts: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    attempts: AtomicU64,
}

type Senders = (Sender<Arc<dyn Job>>, Sender<Arc<dyn Job>>);

/// Fixed set of named worker threads draining two priority channels
pub struct WorkerPool {
    senders: Mutex<Option<Senders>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Spawn the workers
    ///
    /// # Errors
    ///
    /// `Io` if a worker thread cannot be spawned.
    pub fn start(config: WorkerPoolConfig) -> Result<Self> {
        let threads = config.threads.max(1);
        let queue_capacity = config.queue_capacity.max(1);
        let (fg_tx, fg_rx) = bounded::<Arc<dyn Job>>(queue_capacity);
        let (bg_tx, bg_rx) = bounded::<Arc<dyn Job>>(queue_capacity);
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(threads);
        for idx in 0..threads {
            let fg_rx = fg_rx.clone();
            let bg_rx = bg_rx.clone();
            let counters = Arc::clone(&counters);
            let max_attempts = config.max_attempts;
            let backoff = config.retry_backoff;
            let handle = thread::Builder::new()
                .name(format!("{}-worker-{}", config.name, idx))
                .spawn(move || worker_loop(fg_rx, bg_rx, counters, max_attempts, backoff))
                .map_err(|e| {
                    ExError::new(ExErrorKind::Io)
                        .with_op("start_worker_pool")
                        .with_message(format!("failed to spawn worker {}: {}", idx, e))
                })?;
            handles.push(handle);
        }

        tracing::info!(pool = %config.name, threads, queue_capacity, "Worker pool started");

        Ok(Self {
            senders: Mutex::new(Some((fg_tx, bg_tx))),
            workers: Mutex::new(handles),
            counters,
            queue_capacity,
        })
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            attempts: self.counters.attempts.load(Ordering::SeqCst),
        }
    }

    /// Stop accepting jobs, let the workers drain what is queued, and join them
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        // Dropping the senders disconnects the channels once they are empty.
        let senders = self.senders.lock().unwrap_or_else(|e| e.into_inner()).take();
        drop(senders);

        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

impl JobQueue for WorkerPool {
    fn enqueue(&self, job: Arc<dyn Job>, priority: Priority) -> Result<()> {
        let guard = self.senders.lock().unwrap_or_else(|e| e.into_inner());
        let Some((fg, bg)) = guard.as_ref() else {
            return Err(closed());
        };
        let tx = match priority {
            Priority::High | Priority::Normal => fg,
            Priority::Low => bg,
        };
        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => Err(ExError::new(ExErrorKind::QueueFull)
                .with_op("enqueue_job")
                .with_message(format!(
                    "{:?} queue is full (capacity {}), dropped {}",
                    priority,
                    self.queue_capacity,
                    job.label()
                ))),
            Err(TrySendError::Disconnected(_)) => Err(closed()),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn closed() -> ExError {
    ExError::new(ExErrorKind::QueueClosed)
        .with_op("enqueue_job")
        .with_message("worker pool is shut down")
}

fn worker_loop(
    fg: Receiver<Arc<dyn Job>>,
    bg: Receiver<Arc<dyn Job>>,
    counters: Arc<Counters>,
    max_attempts: u32,
    backoff: Duration,
) {
    let mut fg_open = true;
    let mut bg_open = true;
    while let Some(job) = next_job(&fg, &bg, &mut fg_open, &mut bg_open) {
        let (attempts, result) = run_with_retries(job.as_ref(), max_attempts, backoff);
        counters
            .attempts
            .fetch_add(u64::from(attempts), Ordering::SeqCst);
        match result {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) => {
                counters.failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!(
                    job = %job.label(),
                    attempts,
                    err.code = err.code(),
                    err.message = err.message(),
                    "Job failed"
                );
            }
        }
    }
}

/// Next job to run, preferring the foreground channel; `None` once both
/// channels are disconnected and empty
fn next_job(
    fg: &Receiver<Arc<dyn Job>>,
    bg: &Receiver<Arc<dyn Job>>,
    fg_open: &mut bool,
    bg_open: &mut bool,
) -> Option<Arc<dyn Job>> {
    loop {
        if *fg_open {
            match fg.try_recv() {
                Ok(job) => return Some(job),
                Err(TryRecvError::Disconnected) => *fg_open = false,
                Err(TryRecvError::Empty) => {}
            }
        }

        match (*fg_open, *bg_open) {
            (false, false) => return None,
            (true, false) => match fg.recv() {
                Ok(job) => return Some(job),
                Err(_) => *fg_open = false,
            },
            (false, true) => match bg.recv() {
                Ok(job) => return Some(job),
                Err(_) => *bg_open = false,
            },
            (true, true) => {
                let received = select! {
                    recv(fg) -> msg => msg.map_err(|_| true),
                    recv(bg) -> msg => msg.map_err(|_| false),
                };
                match received {
                    Ok(job) => return Some(job),
                    Err(true) => *fg_open = false,
                    Err(false) => *bg_open = false,
                }
            }
        }
    }
}
