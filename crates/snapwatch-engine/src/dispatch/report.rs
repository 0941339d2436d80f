//! Results of dispatch runs

use snapwatch_core::model::{ComparisonPair, EntityRef};
use snapwatch_core_types::RunId;

/// What a successful fan-out did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub run_id: RunId,
    pub entity: EntityRef,
    pub pair: ComparisonPair,
    /// Ids of the captures folded into this comparison, oldest first
    pub capture_ids: Vec<i64>,
    /// Comparators invoked, in invocation order
    pub invoked: Vec<String>,
}

/// Result of `Dispatcher::process`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No unprocessed capture was left for the entity
    AlreadyHandled,
    /// The batch was claimed but ordered before the last compared capture,
    /// so no comparator was invoked
    Stale,
    Dispatched(FanOutReport),
}

impl DispatchOutcome {
    pub fn report(&self) -> Option<&FanOutReport> {
        match self {
            DispatchOutcome::Dispatched(report) => Some(report),
            _ => None,
        }
    }
}
