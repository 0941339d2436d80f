//! Filesystem blob store
//!
//! Versions are the SHA-256 of the content, so re-putting identical bytes is
//! idempotent and yields the same pointer.

use crate::blob::atomic::atomic_write;
use crate::blob::sharding::version_path;
use crate::blob::BlobStore;
use crate::errors::{blob_missing, io_error, Result};
use sha2::{Digest, Sha256};
use snapwatch_core::model::BlobPointer;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-backed blob store
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    bucket: String,
}

impl FsBlobStore {
    /// Create a store writing into `bucket` under `root`
    pub fn new(root: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            bucket: bucket.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn compute_version(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }
}

impl BlobStore for FsBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobPointer> {
        let version = Self::compute_version(bytes);
        let target = version_path(&self.root, &self.bucket, key, &version)?;

        if !target.exists() {
            atomic_write(&target, bytes)?;
            tracing::debug!(bucket = %self.bucket, key, version = %version, "Stored blob");
        }

        Ok(BlobPointer::new(self.bucket.clone(), key, version))
    }

    fn get(&self, bucket: &str, key: &str, version: &str) -> Result<Vec<u8>> {
        let path = version_path(&self.root, bucket, key, version)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(blob_missing(bucket, key, version)),
            Err(e) => Err(io_error("blob_get", e)),
        }
    }
}
