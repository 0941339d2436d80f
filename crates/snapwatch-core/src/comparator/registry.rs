//! Comparator registry
//!
//! An explicit, injectable set of comparators owned by the composition root.
//! Populated once at boot and read on every capture; `clear` exists for test
//! isolation.

#![allow(clippy::result_large_err)]

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Comparator;
use crate::errors::{ExError, ExErrorKind, Result};
use crate::model::CaptureDescriptor;

/// Set of registered comparators, keyed by comparator type
#[derive(Default)]
pub struct ComparatorRegistry {
    entries: RwLock<HashMap<TypeId, Arc<dyn Comparator>>>,
}

impl ComparatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a comparator
    ///
    /// Registering a second instance of an already registered type is
    /// absorbed silently and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// `InvalidComparator` if the comparator's name is blank, or the name is
    /// already held by a different comparator type.
    pub fn register<C: Comparator + 'static>(&self, comparator: C) -> Result<bool> {
        let name = comparator.name().trim().to_string();
        if name.is_empty() {
            return Err(ExError::new(ExErrorKind::InvalidComparator)
                .with_op("register_comparator")
                .with_message(format!(
                    "{} has a blank name",
                    std::any::type_name::<C>()
                )));
        }

        let type_id = TypeId::of::<C>();
        let mut entries = self.write();
        if entries.contains_key(&type_id) {
            return Ok(false);
        }
        if entries.values().any(|c| c.name().trim() == name) {
            return Err(ExError::new(ExErrorKind::InvalidComparator)
                .with_op("register_comparator")
                .with_comparator(name.clone())
                .with_message(format!(
                    "name '{}' is already registered by another comparator",
                    name
                )));
        }

        entries.insert(type_id, Arc::new(comparator));
        tracing::info!(comparator = %name, total = entries.len(), "Registered comparator");
        Ok(true)
    }

    /// Remove a comparator type. Returns false if it was not registered.
    pub fn remove<C: Comparator + 'static>(&self) -> bool {
        let removed = self.write().remove(&TypeId::of::<C>());
        if let Some(c) = &removed {
            tracing::info!(comparator = %c.name(), "Removed comparator");
        }
        removed.is_some()
    }

    /// Remove every comparator
    pub fn clear(&self) {
        self.write().clear();
    }

    /// Snapshot of the registered comparators
    ///
    /// The returned vector is a copy: changing it does not touch the registry.
    /// Order is unspecified.
    pub fn registered(&self) -> Vec<Arc<dyn Comparator>> {
        self.read().values().cloned().collect()
    }

    pub fn contains<C: Comparator + 'static>(&self) -> bool {
        self.read().contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Comparators whose `accepts` is true for the capture
    pub fn accepting(&self, capture: &CaptureDescriptor) -> Vec<Arc<dyn Comparator>> {
        self.read()
            .values()
            .filter(|c| c.accepts(capture))
            .cloned()
            .collect()
    }

    /// True if at least one comparator accepts the capture
    pub fn any_accepts(&self, capture: &CaptureDescriptor) -> bool {
        self.read().values().any(|c| c.accepts(capture))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Arc<dyn Comparator>>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Arc<dyn Comparator>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ComparatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self
            .read()
            .values()
            .map(|c| c.name().to_string())
            .collect();
        f.debug_struct("ComparatorRegistry")
            .field("comparators", &names)
            .finish()
    }
}
