//! Snapshot navigation helpers
//!
//! Pure functions over the generic capture tree that comparators use to read
//! a capture: walk children by core module, read and coerce model fields,
//! parse timestamps, resolve the live entity a node documents, and tell
//! whether a field changed between two captures.
//!
//! Nothing here performs I/O; fetching capture bytes lives in
//! `snapwatch-store`.

pub mod changes;
pub mod field;
pub mod navigate;
pub mod resolve;
pub mod time;
pub mod tree;

pub use changes::{changed_fields, field_changed};
pub use field::{FieldDataType, FieldReader, FieldTypeRegistry, FieldValue, StaticFieldTypes};
pub use navigate::{children_of, first_child_of};
pub use resolve::{resolve_entity, EntityLoaders};
pub use time::{parse_time, parse_zone};
pub use tree::SnapshotNode;
