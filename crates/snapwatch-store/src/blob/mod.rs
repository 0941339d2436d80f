//! Blob storage for capture payloads
//!
//! Provides:
//! - `BlobStore` trait addressed by `(bucket, key, version)`
//! - Filesystem store with content-addressed versions and atomic writes
//! - In-memory store with numbered versions

mod atomic;
mod fs_store;
mod memory;
mod sharding;

pub use fs_store::FsBlobStore;
pub use memory::MemoryBlobStore;

use crate::errors::Result;
use snapwatch_core::model::BlobPointer;

/// Versioned object storage holding capture payloads
pub trait BlobStore: Send + Sync {
    /// Bucket that `put` writes into
    fn bucket(&self) -> &str;

    /// Store `bytes` as a new version of `key`
    ///
    /// # Errors
    ///
    /// `InvalidInput` for keys that are blank or escape the store, `Io` for
    /// write failures.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobPointer>;

    /// Read one version of an object
    ///
    /// # Errors
    ///
    /// `MissingBlob` if no such object exists.
    fn get(&self, bucket: &str, key: &str, version: &str) -> Result<Vec<u8>>;
}

impl<T: BlobStore + ?Sized> BlobStore for std::sync::Arc<T> {
    fn bucket(&self) -> &str {
        (**self).bucket()
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<BlobPointer> {
        (**self).put(key, bytes)
    }

    fn get(&self, bucket: &str, key: &str, version: &str) -> Result<Vec<u8>> {
        (**self).get(bucket, key, version)
    }
}
