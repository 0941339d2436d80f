//! Per-entity run serialisation
//!
//! A dispatch run holds its entity's gate from the claim until the last
//! comparator returns, so pairs for one entity reach comparators in claim
//! order and two runs never compare the same entity at once. Runs for
//! different entities proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use snapwatch_core::model::EntityRef;

#[derive(Debug, Default)]
pub struct EntityGate {
    slots: Mutex<HashMap<EntityRef, Arc<Mutex<()>>>>,
}

impl EntityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while no other run for `entity` is in flight
    pub fn with_entity<T>(&self, entity: &EntityRef, f: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(entity.clone()).or_default().clone()
        };

        let result = {
            let _held = slot.lock().unwrap_or_else(|e| e.into_inner());
            f()
        };

        // Only the map and this call still hold the slot: nobody is waiting.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if Arc::strong_count(&slot) == 2 {
            slots.remove(entity);
        }
        result
    }

    /// Entities with a run in flight or waiting
    pub fn busy(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
