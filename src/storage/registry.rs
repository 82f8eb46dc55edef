use crate::core::{EntityMetadata, EntityType, GraphError, Result};
use crate::entity::{Entity, EntityHandle, EntityModel};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::TypeId;
use std::collections::HashMap;

type MaterializeFn = fn(serde_json::Value) -> Result<EntityHandle>;
type SnapshotFn = fn(&dyn Entity) -> Result<serde_json::Value>;

/// Everything the context knows about one mapped type.
#[derive(Clone)]
pub struct EntityRegistration {
    pub metadata: EntityMetadata,
    materialize: MaterializeFn,
    snapshot: SnapshotFn,
}

impl EntityRegistration {
    pub fn of<T>() -> Self
    where
        T: EntityModel + Serialize + DeserializeOwned,
    {
        Self {
            metadata: T::metadata(),
            materialize: materialize::<T>,
            snapshot: snapshot::<T>,
        }
    }

    /// Builds a fresh, partially loaded instance from a stored row.
    pub fn materialize(&self, row: serde_json::Value) -> Result<EntityHandle> {
        (self.materialize)(row)
    }

    /// Serialized scalar state used for change detection.
    pub fn snapshot(&self, entity: &dyn Entity) -> Result<serde_json::Value> {
        (self.snapshot)(entity)
    }

    /// The single key member, or a key metadata error.
    pub fn single_key(&self) -> Result<&'static str> {
        match self.metadata.key_members.as_slice() {
            [member] => Ok(*member),
            members => Err(GraphError::KeyMetadata {
                type_name: self.metadata.entity_type.name().to_string(),
                message: format!("expected a single key member, found {}", members.len()),
            }),
        }
    }
}

fn materialize<T>(row: serde_json::Value) -> Result<EntityHandle>
where
    T: EntityModel + DeserializeOwned,
{
    let entity: T = serde_json::from_value(row)?;
    Ok(EntityHandle::new(entity))
}

fn snapshot<T>(entity: &dyn Entity) -> Result<serde_json::Value>
where
    T: EntityModel + Serialize,
{
    let typed = entity
        .as_any()
        .downcast_ref::<T>()
        .ok_or(GraphError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            actual: entity.entity_type().name(),
        })?;
    Ok(serde_json::to_value(typed)?)
}

/// Mapped types of one context.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeId, EntityRegistration>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, registration: EntityRegistration) {
        self.types
            .insert(registration.metadata.entity_type.id(), registration);
    }

    pub fn get(&self, entity_type: &EntityType) -> Option<&EntityRegistration> {
        self.types.get(&entity_type.id())
    }

    /// Like [`TypeRegistry::get`] but unmapped types are an error.
    pub fn require(&self, entity_type: &EntityType) -> Result<&EntityRegistration> {
        self.get(entity_type)
            .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
