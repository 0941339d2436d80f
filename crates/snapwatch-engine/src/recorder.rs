//! Capture write path
//!
//! Serialises an entity's tree into the blob store, records the capture, and
//! hands it to the dispatcher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use snapwatch_core::errors::Result;
use snapwatch_core::model::{Capture, EntityRef, NewCapture};
use snapwatch_core::snapshot::SnapshotNode;
use snapwatch_store::capture::insert_capture;
use snapwatch_store::BlobStore;

use crate::dispatch::Dispatcher;

/// Records captures of entity state
#[derive(Clone)]
pub struct CaptureRecorder {
    store: Arc<dyn BlobStore>,
    dispatcher: Dispatcher,
}

impl CaptureRecorder {
    pub fn new(store: Arc<dyn BlobStore>, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Blob key a capture of `entity` is stored under
    pub fn blob_key(entity: &EntityRef) -> String {
        format!("{}/{}", entity.kind, entity.id)
    }

    /// Record a capture of `tree` as the current state of `entity`
    ///
    /// # Errors
    ///
    /// Blob or ledger write failures. A dispatch enqueue failure is logged
    /// but not returned: the capture row is durable, and the next run for
    /// the entity folds it into its batch.
    pub fn record(&self, entity: &EntityRef, tree: &SnapshotNode) -> Result<Capture> {
        self.record_new(entity, tree, None)
    }

    /// Like [`CaptureRecorder::record`] with an explicit `created_at`
    ///
    /// # Errors
    ///
    /// As for [`CaptureRecorder::record`].
    pub fn record_at(
        &self,
        entity: &EntityRef,
        tree: &SnapshotNode,
        created_at: DateTime<Utc>,
    ) -> Result<Capture> {
        self.record_new(entity, tree, Some(created_at))
    }

    fn record_new(
        &self,
        entity: &EntityRef,
        tree: &SnapshotNode,
        created_at: Option<DateTime<Utc>>,
    ) -> Result<Capture> {
        let bytes = tree.to_vec()?;
        let pointer = self.store.put(&Self::blob_key(entity), &bytes)?;

        let mut new = NewCapture::new(entity.clone(), pointer);
        new.created_at = created_at;
        let conn = self.dispatcher.ledger().connect()?;
        let capture = insert_capture(&conn, &new)?;
        drop(conn);

        tracing::info!(
            capture_id = capture.id,
            recordable_type = %entity.kind,
            recordable_id = entity.id,
            "Recorded capture"
        );

        if let Err(err) = self.dispatcher.handle_capture(&capture) {
            tracing::warn!(
                capture_id = capture.id,
                err.code = err.code(),
                err.message = err.message(),
                "Dispatch not enqueued; capture left for the next run"
            );
        }
        Ok(capture)
    }
}

impl std::fmt::Debug for CaptureRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureRecorder")
            .field("bucket", &self.store.bucket())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
