//! Resolving the live entity a capture node documents

use std::collections::HashMap;
use std::fmt;

use super::tree::SnapshotNode;
use crate::errors::{ExError, ExErrorKind, Result, SnapshotError};

type Loader<R> = Box<dyn Fn(i64) -> Result<Option<R>> + Send + Sync>;

/// Lookup table from core module name to a loader for that kind's live record
pub struct EntityLoaders<R> {
    loaders: HashMap<String, Loader<R>>,
}

impl<R> Default for EntityLoaders<R> {
    fn default() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }
}

impl<R> EntityLoaders<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the loader for `kind`
    pub fn register<F>(&mut self, kind: impl Into<String>, loader: F) -> &mut Self
    where
        F: Fn(i64) -> Result<Option<R>> + Send + Sync + 'static,
    {
        self.loaders.insert(kind.into(), Box::new(loader));
        self
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.loaders.contains_key(kind)
    }

    /// Load the record `id` of `kind`
    ///
    /// # Errors
    ///
    /// `UnknownEntityKind` if no loader is registered for `kind`; otherwise
    /// whatever the loader returns.
    pub fn resolve(&self, kind: &str, id: i64) -> Result<Option<R>> {
        let loader = self.loaders.get(kind).ok_or_else(|| {
            ExError::from(SnapshotError::UnknownEntityKind {
                kind: kind.to_string(),
            })
            .with_op("resolve_entity")
        })?;
        loader(id)
    }
}

impl<R> fmt::Debug for EntityLoaders<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.loaders.keys().collect();
        kinds.sort();
        f.debug_struct("EntityLoaders").field("kinds", &kinds).finish()
    }
}

/// Load the live record `node` documents
///
/// Returns `Ok(None)` when the node carries no record id or the record no
/// longer exists.
///
/// # Errors
///
/// `UnknownEntityKind` if no loader is registered for the node's core
/// module; loader errors are propagated with the entity attached.
pub fn resolve_entity<R>(node: &SnapshotNode, loaders: &EntityLoaders<R>) -> Result<Option<R>> {
    let Some(entity) = node.entity_ref() else {
        return Ok(None);
    };
    loaders
        .resolve(entity.kind.as_str(), entity.id)
        .map_err(|e| match e.kind() {
            ExErrorKind::UnknownEntityKind => e,
            _ => e.with_entity(&entity),
        })
}
