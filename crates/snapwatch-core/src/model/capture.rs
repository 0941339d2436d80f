//! Capture records and the values handed to comparators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityRef;

/// Pointer into the blob store: `(bucket, path, version)`
///
/// Any blank part means "no data". Comparators receive a blank pointer as
/// the old side of the first comparison for an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobPointer {
    pub bucket: Option<String>,
    pub path: Option<String>,
    pub version: Option<String>,
}

impl BlobPointer {
    pub fn new(
        bucket: impl Into<String>,
        path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            bucket: Some(bucket.into()),
            path: Some(path.into()),
            version: Some(version.into()),
        }
    }

    /// The all-`None` pointer
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when any of bucket, path or version is missing or whitespace
    pub fn is_blank(&self) -> bool {
        [&self.bucket, &self.path, &self.version]
            .iter()
            .any(|part| part.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// All three parts, or `None` if the pointer is blank
    pub fn parts(&self) -> Option<(&str, &str, &str)> {
        if self.is_blank() {
            return None;
        }
        match (&self.bucket, &self.path, &self.version) {
            (Some(b), Some(p), Some(v)) => Some((b.as_str(), p.as_str(), v.as_str())),
            _ => None,
        }
    }
}

/// A durable Capture Record row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    /// Ordering tiebreaker after `created_at`
    pub id: i64,
    pub recordable: EntityRef,
    pub pointer: BlobPointer,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, when the capture is folded into a comparison
    pub compared_at: Option<DateTime<Utc>>,
}

impl Capture {
    pub fn descriptor(&self) -> CaptureDescriptor {
        CaptureDescriptor {
            capture_id: self.id,
            recordable: self.recordable.clone(),
            created_at: self.created_at,
        }
    }

    pub fn is_compared(&self) -> bool {
        self.compared_at.is_some()
    }

    /// Total order key for captures of one entity
    pub fn order_key(&self) -> (DateTime<Utc>, i64) {
        (self.created_at, self.id)
    }
}

/// What a comparator gets to see when deciding whether it accepts a capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDescriptor {
    pub capture_id: i64,
    pub recordable: EntityRef,
    pub created_at: DateTime<Utc>,
}

/// Input for inserting a Capture Record after a successful blob write
#[derive(Debug, Clone)]
pub struct NewCapture {
    pub recordable: EntityRef,
    pub pointer: BlobPointer,
    /// Defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

impl NewCapture {
    pub fn new(recordable: EntityRef, pointer: BlobPointer) -> Self {
        Self {
            recordable,
            pointer,
            created_at: None,
        }
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Arguments of one `compare` call
///
/// `old` equals the `new` of the previous call for the same entity, or is
/// blank on the first call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonPair {
    pub entity: EntityRef,
    pub old: BlobPointer,
    pub new: BlobPointer,
}
