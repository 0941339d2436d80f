//! In-memory blob store
//!
//! Versions are per-key counters ("1", "2", …). Used by tests and by embedders
//! that keep captures in process.

use crate::blob::sharding::key_segments;
use crate::blob::BlobStore;
use crate::errors::{blob_missing, Result};
use snapwatch_core::model::BlobPointer;
use std::collections::HashMap;
use std::sync::Mutex;

/// Blob store holding every version in memory
#[derive(Debug)]
pub struct MemoryBlobStore {
    bucket: String,
    objects: Mutex<HashMap<(String, String), Vec<Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Number of versions stored for `key` in this store's bucket
    pub fn version_count(&self, key: &str) -> usize {
        self.objects
            .lock()
            .map(|objects| {
                objects
                    .get(&(self.bucket.clone(), key.to_string()))
                    .map(Vec::len)
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobPointer> {
        key_segments(key)?;
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let versions = objects
            .entry((self.bucket.clone(), key.to_string()))
            .or_default();
        versions.push(bytes.to_vec());
        Ok(BlobPointer::new(
            self.bucket.clone(),
            key,
            versions.len().to_string(),
        ))
    }

    fn get(&self, bucket: &str, key: &str, version: &str) -> Result<Vec<u8>> {
        let index = version
            .parse::<usize>()
            .ok()
            .and_then(|v| v.checked_sub(1))
            .ok_or_else(|| blob_missing(bucket, key, version))?;
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|versions| versions.get(index))
            .cloned()
            .ok_or_else(|| blob_missing(bucket, key, version))
    }
}
