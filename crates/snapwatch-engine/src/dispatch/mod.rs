//! Capture dispatch
//!
//! `handle_capture` decides, right after a capture is written, whether any
//! comparator cares about it and if so enqueues a dispatch run. A run claims
//! every unprocessed capture of the entity in one atomic update and hands the
//! comparators a single `(old, new)` pair spanning the whole batch. Runs for
//! one entity are serialised from claim to the last comparator call, so
//! pairs arrive in capture order.

mod dispatcher;
mod gate;
mod job;
mod report;

pub use dispatcher::{ClaimedBatch, Dispatcher};
pub use gate::EntityGate;
pub use job::ProcessCaptureJob;
pub use report::{DispatchOutcome, FanOutReport};
