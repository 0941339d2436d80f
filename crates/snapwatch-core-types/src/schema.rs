//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Capture identifiers
pub const FIELD_CAPTURE_ID: &str = "capture_id";
pub const FIELD_RECORDABLE_TYPE: &str = "recordable_type";
pub const FIELD_RECORDABLE_ID: &str = "recordable_id";

// Dispatch
pub const FIELD_COMPARATOR: &str = "comparator";
pub const FIELD_BATCH_LEN: &str = "batch_len";
pub const FIELD_ATTEMPT: &str = "attempt";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
