//! Boundary to the persistence context that owns query execution, lazy
//! loading, metadata and change tracking.

mod guard;

pub use guard::ChangeTrackingGuard;

use crate::core::{EntityMetadata, EntityType, Result};
use crate::entity::EntityHandle;

/// Operations the graph loader requires from a persistence context.
///
/// A context is not expected to be shared between concurrent loads; each
/// root-level call borrows it mutably for its whole duration.
pub trait PersistenceContext {
    /// Mapping metadata for `entity_type`, or `None` when the type is unmapped.
    fn entity_metadata(&self, entity_type: &EntityType) -> Option<EntityMetadata>;

    /// Whether the named relationship of `entity` is already resident.
    fn is_loaded(&self, entity: &EntityHandle, relationship: &str) -> Result<bool>;

    /// Fetches the named collection and stores it in the entity's field.
    fn load_collection(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()>;

    /// Fetches the named reference and stores it in the entity's field.
    fn load_reference(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()>;

    fn auto_detect_changes_enabled(&self) -> bool;

    fn set_auto_detect_changes_enabled(&mut self, enabled: bool);
}

impl<C: PersistenceContext + ?Sized> PersistenceContext for &mut C {
    fn entity_metadata(&self, entity_type: &EntityType) -> Option<EntityMetadata> {
        (**self).entity_metadata(entity_type)
    }

    fn is_loaded(&self, entity: &EntityHandle, relationship: &str) -> Result<bool> {
        (**self).is_loaded(entity, relationship)
    }

    fn load_collection(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        (**self).load_collection(entity, relationship)
    }

    fn load_reference(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        (**self).load_reference(entity, relationship)
    }

    fn auto_detect_changes_enabled(&self) -> bool {
        (**self).auto_detect_changes_enabled()
    }

    fn set_auto_detect_changes_enabled(&mut self, enabled: bool) {
        (**self).set_auto_detect_changes_enabled(enabled)
    }
}
