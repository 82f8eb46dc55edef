//! Capability interface every participating entity type implements.
//!
//! Entities expose their scalar members and navigation fields by name so the
//! loader and the persistence context can work on any mapped type without
//! hand-written glue. `#[derive(Entity)]` generates these impls.

mod handle;

pub use handle::EntityHandle;

use crate::core::{EntityMetadata, EntityType, KeyValue, Result};
use std::any::Any;

/// Current value of a navigation field.
#[derive(Debug, Clone)]
pub enum Navigation {
    Reference(Option<EntityHandle>),
    Collection(Vec<EntityHandle>),
}

impl Navigation {
    pub fn into_reference(self) -> Option<Option<EntityHandle>> {
        match self {
            Self::Reference(target) => Some(target),
            Self::Collection(_) => None,
        }
    }

    pub fn into_collection(self) -> Option<Vec<EntityHandle>> {
        match self {
            Self::Collection(items) => Some(items),
            Self::Reference(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Reference(target) => usize::from(target.is_some()),
            Self::Collection(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Object-safe access to a mapped entity instance.
pub trait Entity: Any + Send + Sync {
    /// Concrete runtime type of this instance.
    fn entity_type(&self) -> EntityType;

    /// Reads a scalar member by name.
    fn property(&self, name: &str) -> Result<KeyValue>;

    /// Reads a navigation field by relationship name.
    fn navigation(&self, name: &str) -> Result<Navigation>;

    /// Overwrites a navigation field by relationship name.
    fn set_navigation(&mut self, name: &str, value: Navigation) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Static side of an entity type: the mapping the context registers.
pub trait EntityModel: Entity + Sized {
    fn metadata() -> EntityMetadata;

    fn model_type() -> EntityType {
        EntityType::of::<Self>()
    }
}

/// Converts a scalar field into a [`KeyValue`].
pub trait ToKeyValue {
    fn to_key_value(&self) -> KeyValue;
}

macro_rules! impl_to_key_value_int {
    ($($ty:ty),*) => {
        $(
            impl ToKeyValue for $ty {
                fn to_key_value(&self) -> KeyValue {
                    KeyValue::Integer(i64::from(*self))
                }
            }
        )*
    };
}

impl_to_key_value_int!(i8, i16, i32, i64, u8, u16, u32);

impl ToKeyValue for String {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Text(self.clone())
    }
}

impl ToKeyValue for &str {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Text((*self).to_string())
    }
}

impl ToKeyValue for bool {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Boolean(*self)
    }
}

impl ToKeyValue for KeyValue {
    fn to_key_value(&self) -> KeyValue {
        self.clone()
    }
}

impl<T: ToKeyValue> ToKeyValue for Option<T> {
    fn to_key_value(&self) -> KeyValue {
        self.as_ref()
            .map(ToKeyValue::to_key_value)
            .unwrap_or(KeyValue::Null)
    }
}
