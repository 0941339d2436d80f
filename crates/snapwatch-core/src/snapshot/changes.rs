//! Field-level change detection between two captures

use super::field::FieldReader;
use super::tree::SnapshotNode;
use crate::errors::SnapshotError;

/// Whether `uid` holds a different coerced value in `new` than in `old`
///
/// A field absent from one side and present on the other counts as changed.
/// A missing `old` (first capture of an entity) counts as changed when `new`
/// holds a value.
///
/// # Errors
///
/// Propagates coercion failures from either side.
pub fn field_changed(
    reader: &FieldReader<'_>,
    old: Option<&SnapshotNode>,
    new: &SnapshotNode,
    uid: &str,
) -> Result<bool, SnapshotError> {
    let before = match old {
        Some(node) => reader.value(node, uid)?,
        None => None,
    };
    let after = reader.value(new, uid)?;
    Ok(before != after)
}

/// The subset of `uids` whose coerced value changed, in the order given
///
/// # Errors
///
/// Propagates the first coercion failure.
pub fn changed_fields<'u>(
    reader: &FieldReader<'_>,
    old: Option<&SnapshotNode>,
    new: &SnapshotNode,
    uids: &[&'u str],
) -> Result<Vec<&'u str>, SnapshotError> {
    let mut changed = Vec::new();
    for uid in uids {
        if field_changed(reader, old, new, uid)? {
            changed.push(*uid);
        }
    }
    Ok(changed)
}
