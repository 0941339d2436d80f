//! Correlation types for dispatch tracking
//!
//! A `RunId` tags one dispatch run (one claim + fan-out of a capture batch)
//! so that every log line and error produced by that run can be joined back
//! together, including lines emitted from worker threads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a single dispatch run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a new time-ordered RunId (UUIDv7)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Upstream trace identifier, carried when the mutation that produced a
/// capture was itself part of a traced request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context carried from the triggering capture into its dispatch run
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub run_id: RunId,
    pub trace_id: Option<TraceId>,
    /// Delivery attempt, starting at 1
    pub attempt: u32,
}

impl DispatchContext {
    /// Create a context for the first attempt of a fresh run
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            trace_id: None,
            attempt: 1,
        }
    }

    /// Add a TraceId to the context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Same run, next delivery attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            run_id: self.run_id.clone(),
            trace_id: self.trace_id.clone(),
            attempt: self.attempt + 1,
        }
    }
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_generation() {
        let id1 = RunId::new();
        let id2 = RunId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_next_attempt_keeps_run_id() {
        let ctx = DispatchContext::new().with_trace_id(TraceId::new());
        let retry = ctx.next_attempt();

        assert_eq!(retry.run_id, ctx.run_id);
        assert_eq!(retry.trace_id, ctx.trace_id);
        assert_eq!(retry.attempt, 2);
    }

    #[test]
    fn test_serialization() {
        let id = RunId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: RunId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
