//! Snapwatch configuration
//!
//! Loaded from TOML. Every section and key is optional:
//!
//! ```toml
//! [database]
//! path = "snapwatch.db"
//! busy_timeout_ms = 5000
//!
//! [blob_store]
//! root = "blobs"
//! bucket = "captures"
//!
//! [dispatch]
//! priority = "low"
//!
//! [workers]
//! threads = 2
//! queue_capacity = 1024
//! max_attempts = 3
//! retry_backoff_ms = 100
//!
//! [snapshot]
//! working_time_zone = "America/New_York"
//!
//! [logging]
//! profile = "production"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;
use snapwatch_core::errors::{ExError, ExErrorKind, Result};
use snapwatch_core::logging_facility::Profile;
use snapwatch_core::snapshot::parse_zone;
use snapwatch_store::{FsBlobStore, LedgerDb};

use crate::queue::{Priority, WorkerPoolConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapwatchConfig {
    pub database: DatabaseConfig,
    pub blob_store: BlobStoreConfig,
    pub dispatch: DispatchConfig,
    pub workers: WorkersConfig,
    pub snapshot: SnapshotConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("snapwatch.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlobStoreConfig {
    pub root: PathBuf,
    pub bucket: String,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("blobs"),
            bucket: "captures".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    pub priority: Priority,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkersConfig {
    pub threads: usize,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            queue_capacity: 1024,
            max_attempts: 3,
            retry_backoff_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    /// IANA zone datetime fields are converted into
    pub working_time_zone: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            working_time_zone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl SnapwatchConfig {
    /// Load and validate a config file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it does not parse or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExError::from(e)
                .with_op("load_config")
                .with_message(format!("cannot read {}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    ///
    /// `Config` if the text does not parse or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::Config)
                .with_op("parse_config")
                .with_message(e.to_string())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// `Config` for zero threads, zero queue capacity, zero attempts, a blank
    /// bucket or an unknown time zone.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(ExError::new(ExErrorKind::Config)
                .with_op("validate_config")
                .with_message(message.to_string()))
        };
        if self.workers.threads == 0 {
            return invalid("workers.threads must be at least 1");
        }
        if self.workers.queue_capacity == 0 {
            return invalid("workers.queue_capacity must be at least 1");
        }
        if self.workers.max_attempts == 0 {
            return invalid("workers.max_attempts must be at least 1");
        }
        if self.blob_store.bucket.trim().is_empty() {
            return invalid("blob_store.bucket must not be blank");
        }
        self.working_zone()?;
        Ok(())
    }

    /// # Errors
    ///
    /// `Config` if the zone name is unknown.
    pub fn working_zone(&self) -> Result<Tz> {
        parse_zone(&self.snapshot.working_time_zone)
            .map_err(|e| ExError::from(e).with_op("validate_config"))
    }

    pub fn ledger(&self) -> LedgerDb {
        LedgerDb::new(
            &self.database.path,
            Duration::from_millis(self.database.busy_timeout_ms),
        )
    }

    pub fn blob_store(&self) -> FsBlobStore {
        FsBlobStore::new(&self.blob_store.root, self.blob_store.bucket.clone())
    }

    pub fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            name: "snapwatch".to_string(),
            threads: self.workers.threads,
            queue_capacity: self.workers.queue_capacity,
            max_attempts: self.workers.max_attempts,
            retry_backoff: Duration::from_millis(self.workers.retry_backoff_ms),
        }
    }
}
