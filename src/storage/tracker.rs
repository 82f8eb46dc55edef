use super::registry::TypeRegistry;
use super::table::display_key;
use crate::core::{EntityType, GraphError, KeyValue, Result};
use crate::entity::EntityHandle;
use chrono::{DateTime, Utc};
use std::any::TypeId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unchanged,
    Modified,
}

/// Bookkeeping for one tracked instance.
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    pub handle: EntityHandle,
    pub entity_type: EntityType,
    pub key: Vec<KeyValue>,
    pub state: EntryState,
    pub attached_at: DateTime<Utc>,
    original: serde_json::Value,
    loaded: HashMap<&'static str, DateTime<Utc>>,
}

impl TrackedEntry {
    pub fn is_loaded(&self, relationship: &str) -> bool {
        self.loaded.contains_key(relationship)
    }

    pub fn loaded_at(&self, relationship: &str) -> Option<DateTime<Utc>> {
        self.loaded.get(relationship).copied()
    }
}

/// Identity map plus original snapshots of every tracked instance.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    entries: HashMap<usize, TrackedEntry>,
    identities: HashMap<(TypeId, Vec<KeyValue>), usize>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn track(
        &mut self,
        handle: EntityHandle,
        entity_type: EntityType,
        key: Vec<KeyValue>,
        original: serde_json::Value,
    ) -> Result<()> {
        let identity = handle.identity();
        if self.entries.contains_key(&identity) {
            return Ok(());
        }

        let slot = (entity_type.id(), key.clone());
        if self.identities.contains_key(&slot) {
            return Err(GraphError::Store(format!(
                "Another instance of '{}' with key ({}) is already tracked",
                entity_type.name(),
                display_key(&key)
            )));
        }

        self.identities.insert(slot, identity);
        self.entries.insert(
            identity,
            TrackedEntry {
                handle,
                entity_type,
                key,
                state: EntryState::Unchanged,
                attached_at: Utc::now(),
                original,
                loaded: HashMap::new(),
            },
        );
        Ok(())
    }

    /// Tracked instance of `entity_type` with the given key, if any.
    pub fn find(&self, entity_type: &EntityType, key: &[KeyValue]) -> Option<&EntityHandle> {
        self.identities
            .get(&(entity_type.id(), key.to_vec()))
            .and_then(|identity| self.entries.get(identity))
            .map(|entry| &entry.handle)
    }

    pub fn entry(&self, handle: &EntityHandle) -> Option<&TrackedEntry> {
        self.entries.get(&handle.identity())
    }

    pub fn is_loaded(&self, handle: &EntityHandle, relationship: &str) -> bool {
        self.entry(handle)
            .is_some_and(|entry| entry.is_loaded(relationship))
    }

    pub fn mark_loaded(&mut self, handle: &EntityHandle, relationship: &'static str) -> Result<()> {
        let entry = self.entries.get_mut(&handle.identity()).ok_or_else(|| {
            GraphError::EntityNotTracked(
                handle
                    .entity_type()
                    .map(|ty| ty.name().to_string())
                    .unwrap_or_default(),
            )
        })?;
        entry.loaded.insert(relationship, Utc::now());
        Ok(())
    }

    /// Compares every entry with its original snapshot.
    ///
    /// Returns the number of entries in the modified state afterwards.
    pub fn detect_changes(&mut self, registry: &TypeRegistry) -> Result<usize> {
        let mut modified = 0;
        for entry in self.entries.values_mut() {
            let registration = registry.require(&entry.entity_type)?;
            let current = {
                let guard = entry.handle.read()?;
                registration.snapshot(&*guard)?
            };
            if current != entry.original {
                entry.state = EntryState::Modified;
            }
            if entry.state == EntryState::Modified {
                modified += 1;
            }
        }
        Ok(modified)
    }

    /// Takes fresh snapshots and marks every entry unchanged.
    pub fn accept_all(&mut self, registry: &TypeRegistry) -> Result<()> {
        for entry in self.entries.values_mut() {
            let registration = registry.require(&entry.entity_type)?;
            entry.original = {
                let guard = entry.handle.read()?;
                registration.snapshot(&*guard)?
            };
            entry.state = EntryState::Unchanged;
        }
        Ok(())
    }
}
