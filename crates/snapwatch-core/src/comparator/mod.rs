//! Comparator SPI
//!
//! A comparator reacts to the difference between two captures of the same
//! entity (generate a customs submission, cascade a revalidation, raise an
//! alert). The dispatcher decides *which* pair a comparator sees; the
//! comparator decides *what* to do about it.

pub mod registry;

pub use registry::ComparatorRegistry;

use crate::errors::ExError;
use crate::model::{CaptureDescriptor, ComparisonPair};

/// Capability contract for pluggable comparators
///
/// `compare` may be invoked more than once for the same pair (a retried
/// dispatch re-invokes every accepting comparator), so implementations must
/// be safe to repeat. Calls for one entity arrive in capture order and each
/// call's `old` is the previous call's `new`, but intermediate captures that
/// landed while a run was in flight are collapsed and never observed.
pub trait Comparator: Send + Sync {
    /// Stable name used in logs, errors and the registration contract check
    fn name(&self) -> &str;

    /// Pure, fast predicate: does this comparator handle the capture's entity?
    fn accepts(&self, capture: &CaptureDescriptor) -> bool;

    /// React to the change from `pair.old` to `pair.new`
    ///
    /// # Errors
    ///
    /// Any error is isolated to this comparator; siblings still run and the
    /// batch stays claimed.
    #[allow(clippy::result_large_err)]
    fn compare(&self, pair: &ComparisonPair) -> std::result::Result<(), ExError>;
}
