//! Snapwatch Core - change detection over entity captures
//!
//! This crate provides the types shared by the capture ledger and the
//! dispatcher:
//! - `model`: capture records, entity references and comparison pairs
//! - `comparator`: the comparator capability contract and registry
//! - `snapshot`: pure helpers for reading capture trees
//! - `errors`: the structured error facility
//! - `logging_facility`: tracing initialisation and op lifecycle macros

pub mod comparator;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod snapshot;

pub use comparator::{Comparator, ComparatorRegistry};
pub use errors::{ExError, ExErrorKind, Result, SnapshotError};
pub use model::{
    BlobPointer, Capture, CaptureDescriptor, ComparisonPair, EntityKind, EntityRef, NewCapture,
};
pub use snapshot::SnapshotNode;
