//! Snapwatch Engine - dispatch of captures to comparators
//!
//! Provides:
//! - Job queue trait with inline, deferred and worker-pool implementations
//! - The dispatcher (`handle_capture` / `process`) with its exactly-once claim
//! - `CaptureRecorder`, the write path from entity tree to dispatched capture
//! - TOML configuration

pub mod config;
pub mod dispatch;
pub mod queue;
pub mod recorder;

pub use config::SnapwatchConfig;
pub use dispatch::{DispatchOutcome, Dispatcher, FanOutReport, ProcessCaptureJob};
pub use queue::{DeferredQueue, InlineQueue, Job, JobQueue, Priority, WorkerPool};
pub use recorder::CaptureRecorder;
