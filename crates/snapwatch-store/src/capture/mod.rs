//! Capture Record ledger and Capture Store Client
//!
//! Provides:
//! - SQLite persistence and ordered queries for Capture Records
//! - The atomic claim that makes each capture comparable exactly once
//! - `CaptureClient` for reading capture trees from the blob store

pub mod client;
pub mod ledger;

pub use client::CaptureClient;
pub use ledger::{
    claim_captures, entities_with_unprocessed, fetch_capture, insert_capture,
    last_compared_capture, list_captures, unprocessed_captures, LedgerDb,
};
