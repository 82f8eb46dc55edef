//! Primary key extraction from live instances.

use crate::context::PersistenceContext;
use crate::core::{EntityMetadata, GraphError, KeyValue, Result};
use crate::entity::EntityHandle;

/// Returns the single primary key value of `entity`.
///
/// Errors with [`GraphError::KeyMetadata`] unless the type declares exactly
/// one key member; use [`primary_keys`] for composite keys.
pub fn primary_key<C: PersistenceContext + ?Sized>(
    context: &C,
    entity: &EntityHandle,
) -> Result<KeyValue> {
    let metadata = mapped_metadata(context, entity)?;
    match metadata.key_members.as_slice() {
        [member] => entity.property(member),
        [] => Err(key_error(&metadata, "no key member declared")),
        members => Err(key_error(
            &metadata,
            &format!(
                "expected a single key member, found {} ({})",
                members.len(),
                members.join(", ")
            ),
        )),
    }
}

/// Returns every key value of `entity` in declaration order.
pub fn primary_keys<C: PersistenceContext + ?Sized>(
    context: &C,
    entity: &EntityHandle,
) -> Result<Vec<KeyValue>> {
    let metadata = mapped_metadata(context, entity)?;
    if metadata.key_members.is_empty() {
        return Err(key_error(&metadata, "no key member declared"));
    }

    let guard = entity.read()?;
    metadata
        .key_members
        .iter()
        .map(|member| guard.property(member))
        .collect()
}

fn mapped_metadata<C: PersistenceContext + ?Sized>(
    context: &C,
    entity: &EntityHandle,
) -> Result<EntityMetadata> {
    let entity_type = entity.entity_type()?;
    context
        .entity_metadata(&entity_type)
        .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))
}

fn key_error(metadata: &EntityMetadata, message: &str) -> GraphError {
    GraphError::KeyMetadata {
        type_name: metadata.entity_type.name().to_string(),
        message: message.to_string(),
    }
}
