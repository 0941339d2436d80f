//! Snapwatch Store - Capture ledger and blob storage
//!
//! Provides:
//! - SQLite Capture Record ledger with an embedded migrations framework
//! - Blob store trait with filesystem and in-memory implementations
//! - Capture Store Client for reading capture trees back out of the blob store

pub mod blob;
pub mod capture;
pub mod db;
pub mod errors;
pub mod migrations;

// Re-export key types
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use capture::{CaptureClient, LedgerDb};
pub use errors::Result;
