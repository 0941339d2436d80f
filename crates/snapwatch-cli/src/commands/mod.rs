//! CLI commands
//!
//! Every command resolves its stores the same way: start from `--config`
//! (or built-in defaults), then let `--db` and `--blobs` override the
//! database path and blob root.

pub mod list;
pub mod migrate;
pub mod process;
pub mod record;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use snapwatch_core::errors::{ExError, Result};
use snapwatch_core::logging_facility;
use snapwatch_core::model::{CaptureDescriptor, ComparisonPair};
use snapwatch_core::{Comparator, ComparatorRegistry};
use snapwatch_engine::{Dispatcher, InlineQueue, SnapwatchConfig};

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Capture ledger database (overrides the config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Blob store root directory (overrides the config)
    #[arg(long)]
    pub blobs: Option<PathBuf>,
}

impl StoreArgs {
    pub fn load(&self) -> Result<SnapwatchConfig> {
        let mut config = match &self.config {
            Some(path) => SnapwatchConfig::load(path)?,
            None => SnapwatchConfig::default(),
        };
        if let Some(db) = &self.db {
            config.database.path = db.clone();
        }
        if let Some(blobs) = &self.blobs {
            config.blob_store.root = blobs.clone();
        }
        logging_facility::init(config.logging.profile);
        Ok(config)
    }
}

/// Prints every comparison pair it sees as one line of JSON
pub struct EchoComparator;

impl Comparator for EchoComparator {
    fn name(&self) -> &str {
        "echo"
    }

    fn accepts(&self, _capture: &CaptureDescriptor) -> bool {
        true
    }

    fn compare(&self, pair: &ComparisonPair) -> std::result::Result<(), ExError> {
        println!("{}", serde_json::to_string(pair)?);
        Ok(())
    }
}

/// Dispatcher wired to an inline queue, so runs finish before the command
/// returns
pub struct Session {
    pub config: SnapwatchConfig,
    pub dispatcher: Dispatcher,
    pub queue: Arc<InlineQueue>,
}

impl Session {
    pub fn open(store: &StoreArgs, echo: bool) -> Result<Self> {
        let config = store.load()?;
        let ledger = config.ledger();
        ledger.migrate()?;

        let registry = Arc::new(ComparatorRegistry::new());
        if echo {
            registry.register(EchoComparator)?;
        }

        let queue = Arc::new(InlineQueue::new(config.workers.max_attempts));
        let dispatcher = Dispatcher::new(registry, ledger, queue.clone())
            .with_priority(config.dispatch.priority);

        Ok(Self {
            config,
            dispatcher,
            queue,
        })
    }
}
