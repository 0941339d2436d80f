//! Capture Store Client
//!
//! Reads capture trees back out of the blob store. A blank pointer, or an
//! object holding only whitespace, reads as the empty tree.

use crate::blob::BlobStore;
use crate::errors::Result;
use snapwatch_core::errors::{ExError, ExErrorKind};
use snapwatch_core::model::BlobPointer;
use snapwatch_core::snapshot::SnapshotNode;
use std::sync::Arc;

/// Fetches and parses capture payloads
#[derive(Clone)]
pub struct CaptureClient {
    store: Arc<dyn BlobStore>,
}

impl CaptureClient {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Fetch the tree a pointer refers to
    ///
    /// # Errors
    ///
    /// `MissingBlob` if the object does not exist, `MalformedPayload` if its
    /// bytes are not a capture tree.
    pub fn fetch(&self, pointer: &BlobPointer) -> Result<SnapshotNode> {
        match pointer.parts() {
            Some((bucket, key, version)) => self.fetch_parts(bucket, key, version),
            None => Ok(SnapshotNode::default()),
        }
    }

    /// Fetch the tree at `(bucket, key, version)`; any blank part → empty tree
    ///
    /// # Errors
    ///
    /// As for [`CaptureClient::fetch`].
    pub fn fetch_parts(&self, bucket: &str, key: &str, version: &str) -> Result<SnapshotNode> {
        if [bucket, key, version].iter().any(|s| s.trim().is_empty()) {
            return Ok(SnapshotNode::default());
        }

        let bytes = self.store.get(bucket, key, version)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SnapshotNode::default());
        }

        SnapshotNode::from_slice(&bytes).map_err(|e| {
            ExError::new(ExErrorKind::MalformedPayload)
                .with_op("fetch_capture_tree")
                .with_message(format!(
                    "capture {}/{}@{} is not a capture tree",
                    bucket, key, version
                ))
                .with_source(e.into())
        })
    }
}

impl std::fmt::Debug for CaptureClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureClient")
            .field("bucket", &self.store.bucket())
            .finish()
    }
}
