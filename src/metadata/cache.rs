use crate::context::PersistenceContext;
use crate::core::{EntityType, GraphError, RelationshipDescriptor, Result};
use lazy_static::lazy_static;
use log::debug;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

// Process-wide cache shared by every loader that does not bring its own.
lazy_static! {
    static ref GLOBAL_RELATIONSHIP_CACHE: Arc<RelationshipCache> = Arc::new(RelationshipCache::new());
}

/// Maps entity types to their declared relationships.
///
/// Entries are created on first lookup and never replaced or evicted. Two
/// callers racing on an unseen type may both query the context; the first
/// insert wins and both observe the stored entry.
#[derive(Debug, Default)]
pub struct RelationshipCache {
    entries: RwLock<HashMap<TypeId, Arc<[RelationshipDescriptor]>>>,
}

impl RelationshipCache {
    /// Get the global RelationshipCache instance
    pub fn global() -> &'static Arc<RelationshipCache> {
        &GLOBAL_RELATIONSHIP_CACHE
    }

    pub fn new() -> Self {
        Self::default()
    }

    /// Relationships of `entity_type` in declaration order.
    ///
    /// Queries `context` only on a miss. Fails with
    /// [`GraphError::TypeNotMapped`] when the context has no metadata for
    /// the type.
    pub fn relationships_for<C: PersistenceContext + ?Sized>(
        &self,
        context: &C,
        entity_type: &EntityType,
    ) -> Result<Arc<[RelationshipDescriptor]>> {
        if let Some(cached) = self.entries.read()?.get(&entity_type.id()) {
            return Ok(Arc::clone(cached));
        }

        let metadata = context
            .entity_metadata(entity_type)
            .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))?;
        let relationships: Arc<[RelationshipDescriptor]> = metadata.relationships.into();
        debug!(
            "caching {} relationship(s) for '{}'",
            relationships.len(),
            entity_type.short_name()
        );

        let mut entries = self.entries.write()?;
        let stored = entries.entry(entity_type.id()).or_insert(relationships);
        Ok(Arc::clone(stored))
    }

    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(&entity_type.id()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
