//! On-disk layout for blob versions
//!
//! `<root>/<bucket>/<key segments…>/<vv>/<version>.json`, where `vv` is the
//! first two characters of the version so one hot key does not put every
//! version in a single directory.

use crate::errors::{invalid_key, Result};
use std::path::{Path, PathBuf};

/// Path of one version of `key` in `bucket`
///
/// # Errors
///
/// `InvalidInput` if the bucket, key or version is blank or could resolve
/// outside the bucket directory.
pub fn version_path(root: &Path, bucket: &str, key: &str, version: &str) -> Result<PathBuf> {
    let bucket = single_segment(bucket)?;
    let version = single_segment(version)?;

    let mut path = root.join(bucket);
    for segment in key_segments(key)? {
        path.push(segment);
    }
    path.push(shard(version));
    path.push(format!("{}.json", version));
    Ok(path)
}

/// First two characters of `version`, never splitting a multi-byte char
fn shard(version: &str) -> &str {
    match version.char_indices().nth(2) {
        Some((end, _)) => &version[..end],
        None => version,
    }
}

/// Split a `/`-separated key, rejecting anything but plain names
pub fn key_segments(key: &str) -> Result<Vec<&str>> {
    if key.trim().is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(invalid_key(key));
    }
    key.split('/').map(single_segment).collect()
}

fn single_segment(segment: &str) -> Result<&str> {
    let valid = !segment.trim().is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.contains('\0');
    if valid {
        Ok(segment)
    } else {
        Err(invalid_key(segment))
    }
}
