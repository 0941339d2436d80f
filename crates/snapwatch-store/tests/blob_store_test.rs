// Integration tests for the filesystem blob store and the capture client

use snapwatch_core::errors::ExErrorKind;
use snapwatch_core::snapshot::SnapshotNode;
use snapwatch_store::{BlobStore, CaptureClient, FsBlobStore};
use std::sync::Arc;
use tempfile::TempDir;

fn setup_test_store() -> (Arc<FsBlobStore>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp blob root");
    let store = Arc::new(FsBlobStore::new(dir.path(), "captures"));
    (store, dir)
}

#[test]
fn test_capture_tree_survives_store_round_trip() {
    // Given: a capture tree written to the blob store
    let (store, _dir) = setup_test_store();
    let tree = SnapshotNode::new("Order", 12)
        .with_field("ord_ord_num", "PO-12")
        .with_child(SnapshotNode::new("OrderLine", 120).with_field("ordl_qty", "3"));
    let pointer = store.put("Order/12", &tree.to_vec().unwrap()).unwrap();

    // When: the client fetches it back
    let client = CaptureClient::new(store.clone());
    let fetched = client.fetch(&pointer).unwrap();

    // Then: the same tree comes back
    assert_eq!(fetched, tree);
}

#[test]
fn test_blob_lands_under_bucket_key_and_shard() {
    let (store, dir) = setup_test_store();
    let pointer = store.put("Shipment/3", b"{}").unwrap();
    let version = pointer.version.clone().unwrap();

    let expected = dir
        .path()
        .join("captures")
        .join("Shipment")
        .join("3")
        .join(&version[..2])
        .join(format!("{}.json", version));
    assert!(expected.exists());
}

#[test]
fn test_missing_version_surfaces_missing_blob() {
    let (store, _dir) = setup_test_store();
    let client = CaptureClient::new(store);

    let err = client
        .fetch_parts("captures", "Order/12", &"f".repeat(64))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingBlob);
}

#[test]
fn test_non_ascii_version_is_missing_not_a_crash() {
    let (store, _dir) = setup_test_store();
    let client = CaptureClient::new(store);

    let err = client
        .fetch_parts("captures", "Product/1", "日本")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MissingBlob);
}

#[test]
fn test_malformed_capture_is_reported() {
    let (store, _dir) = setup_test_store();
    let pointer = store.put("Order/12", b"[1, 2, 3]").unwrap();

    let err = CaptureClient::new(store).fetch(&pointer).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::MalformedPayload);
    assert!(err.source_error().is_some());
}
