use snapwatch_core_types::RunId;
use thiserror::Error;

use crate::model::EntityRef;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used for programmatic handling,
/// job-queue failure reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    NotFound,
    /// A comparator failed the capability contract at registration
    InvalidComparator,
    UnknownEntityKind,

    // Capture payloads
    /// Capture bytes are not a JSON capture tree
    MalformedPayload,
    /// The blob store has no object for the given (bucket, key, version)
    MissingBlob,
    /// A model field value cannot be coerced to its declared data type
    InvalidFieldValue,
    InvalidTimestamp,

    // Dispatch
    /// One or more comparators failed; siblings still ran
    ComparatorFailed,
    /// Newest unprocessed capture is ordered before the last compared one
    StaleCapture,
    Concurrency,
    QueueFull,
    QueueClosed,

    // Integration/IO
    Config,
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidComparator => "ERR_INVALID_COMPARATOR",
            ExErrorKind::UnknownEntityKind => "ERR_UNKNOWN_ENTITY_KIND",
            ExErrorKind::MalformedPayload => "ERR_MALFORMED_PAYLOAD",
            ExErrorKind::MissingBlob => "ERR_MISSING_BLOB",
            ExErrorKind::InvalidFieldValue => "ERR_INVALID_FIELD_VALUE",
            ExErrorKind::InvalidTimestamp => "ERR_INVALID_TIMESTAMP",
            ExErrorKind::ComparatorFailed => "ERR_COMPARATOR_FAILED",
            ExErrorKind::StaleCapture => "ERR_STALE_CAPTURE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::QueueFull => "ERR_QUEUE_FULL",
            ExErrorKind::QueueClosed => "ERR_QUEUE_CLOSED",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// Whether re-running the failed operation as-is can succeed.
    ///
    /// Job queues use this to decide whether a failed job is worth another
    /// attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExErrorKind::Persistence
                | ExErrorKind::Io
                | ExErrorKind::Concurrency
                | ExErrorKind::MissingBlob
                | ExErrorKind::ComparatorFailed
        )
    }
}

/// Canonical structured error type
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity: Option<String>,
    capture_id: Option<i64>,
    comparator: Option<String>,
    run_id: Option<RunId>,
    message: String,
    source: Option<Box<ExError>>,
    failures: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity: None,
            capture_id: None,
            comparator: None,
            run_id: None,
            message: String::new(),
            source: None,
            failures: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add the entity the failing operation was working on
    pub fn with_entity(mut self, entity: &EntityRef) -> Self {
        self.entity = Some(entity.to_string());
        self
    }

    /// Add capture context
    pub fn with_capture_id(mut self, capture_id: i64) -> Self {
        self.capture_id = Some(capture_id);
        self
    }

    /// Add comparator context
    pub fn with_comparator(mut self, name: impl Into<String>) -> Self {
        self.comparator = Some(name.into());
        self
    }

    /// Add dispatch run context
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add the names of the comparators that failed (ComparatorFailed)
    pub fn with_failures(mut self, names: Vec<String>) -> Self {
        self.failures = Some(names);
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Entity context rendered as `Kind#id`, if any
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn capture_id(&self) -> Option<i64> {
        self.capture_id
    }

    pub fn comparator(&self) -> Option<&str> {
        self.comparator.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }

    /// Names of failed comparators, if any (populated on ComparatorFailed)
    pub fn failures(&self) -> Option<&[String]> {
        self.failures.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity) = &self.entity {
            write!(f, " (entity: {})", entity)?;
        }
        if let Some(capture_id) = self.capture_id {
            write!(f, " (capture_id: {})", capture_id)?;
        }
        if let Some(comparator) = &self.comparator {
            write!(f, " (comparator: {})", comparator)?;
        }
        if let Some(failures) = &self.failures {
            write!(f, " (failed: {})", failures.join(", "))?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for ExError {
    fn from(err: std::io::Error) -> Self {
        ExError::new(ExErrorKind::Io).with_message(err.to_string())
    }
}

impl From<serde_json::Error> for ExError {
    fn from(err: serde_json::Error) -> Self {
        ExError::new(ExErrorKind::Serialization).with_message(err.to_string())
    }
}

// ========== End Error Facility ==========

/// Failures raised while reading capture trees and coercing their fields
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    /// Payload bytes are not a capture tree
    #[error("Malformed capture payload: {reason}")]
    MalformedPayload { reason: String },

    /// A model field value does not match its declared data type
    #[error("Field {uid} cannot be read as {expected}: {value}")]
    InvalidFieldValue {
        uid: String,
        expected: String,
        value: String,
    },

    /// Timestamp string could not be parsed or does not exist in its zone
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// Time zone name is not in the tz database
    #[error("Unknown time zone: {zone}")]
    UnknownTimeZone { zone: String },

    /// No loader is registered for the capture's core module
    #[error("No loader registered for entity kind: {kind}")]
    UnknownEntityKind { kind: String },
}

impl From<SnapshotError> for ExError {
    fn from(err: SnapshotError) -> Self {
        let kind = match &err {
            SnapshotError::MalformedPayload { .. } => ExErrorKind::MalformedPayload,
            SnapshotError::InvalidFieldValue { .. } => ExErrorKind::InvalidFieldValue,
            SnapshotError::InvalidTimestamp { .. } => ExErrorKind::InvalidTimestamp,
            SnapshotError::UnknownTimeZone { .. } => ExErrorKind::Config,
            SnapshotError::UnknownEntityKind { .. } => ExErrorKind::UnknownEntityKind,
        };
        ExError::new(kind).with_message(err.to_string())
    }
}
