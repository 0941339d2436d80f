//! Record command

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use snapwatch_core::model::{EntityKind, EntityRef};
use snapwatch_core::snapshot::SnapshotNode;
use snapwatch_engine::CaptureRecorder;
use snapwatch_store::BlobStore;

use super::{Session, StoreArgs};

#[derive(Debug, Args)]
pub struct RecordArgs {
    /// Entity kind (core-module name, e.g. Product)
    #[arg(long = "type")]
    pub kind: String,

    #[arg(long)]
    pub id: i64,

    /// JSON capture tree
    #[arg(long)]
    pub file: PathBuf,

    /// Print each comparison pair as JSON
    #[arg(long)]
    pub echo: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: RecordArgs) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.file)
        .map_err(|e| format!("cannot read {}: {}", args.file.display(), e))?;
    let tree = SnapshotNode::from_slice(&bytes)?;
    let entity = EntityRef::new(EntityKind::parse(&args.kind), args.id);

    let session = Session::open(&args.store, args.echo)?;
    let blobs: Arc<dyn BlobStore> = Arc::new(session.config.blob_store());
    let recorder = CaptureRecorder::new(blobs, session.dispatcher.clone());

    let capture = recorder.record(&entity, &tree)?;
    println!("Recorded capture {} for {}", capture.id, entity);

    for failure in session.queue.failures() {
        eprintln!(
            "Warning: {} failed after {} attempt(s): {}",
            failure.label, failure.attempts, failure.error
        );
    }
    Ok(())
}
