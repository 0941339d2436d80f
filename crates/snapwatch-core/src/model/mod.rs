pub mod capture;
pub mod entity;

pub use capture::{BlobPointer, Capture, CaptureDescriptor, ComparisonPair, NewCapture};
pub use entity::{EntityKind, EntityRef};
