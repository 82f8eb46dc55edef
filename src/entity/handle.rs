use super::{Entity, Navigation};
use crate::core::{EntityType, GraphError, KeyValue, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared reference to a live entity instance.
///
/// Clones point at the same instance; equality and hashing use instance
/// identity, not field values.
#[derive(Clone)]
pub struct EntityHandle {
    inner: Arc<RwLock<dyn Entity>>,
}

impl EntityHandle {
    pub fn new<T: Entity>(entity: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(entity)),
        }
    }

    /// Wraps a typed instance without copying it.
    pub fn from_arc<T: Entity>(entity: Arc<RwLock<T>>) -> Self {
        Self { inner: entity }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, dyn Entity + 'static>> {
        Ok(self.inner.read()?)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, dyn Entity + 'static>> {
        Ok(self.inner.write()?)
    }

    pub fn entity_type(&self) -> Result<EntityType> {
        Ok(self.read()?.entity_type())
    }

    pub fn property(&self, name: &str) -> Result<KeyValue> {
        self.read()?.property(name)
    }

    pub fn navigation(&self, name: &str) -> Result<Navigation> {
        self.read()?.navigation(name)
    }

    pub fn set_navigation(&self, name: &str, value: Navigation) -> Result<()> {
        self.write()?.set_navigation(name, value)
    }

    /// Address of the shared instance, stable for its lifetime.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &EntityHandle) -> bool {
        self.identity() == other.identity()
    }

    /// Runs `f` against the instance downcast to `T`.
    pub fn with<T: Entity, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let guard = self.read()?;
        let actual = guard.entity_type().name();
        let typed = guard
            .as_any()
            .downcast_ref::<T>()
            .ok_or(GraphError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            })?;
        Ok(f(typed))
    }

    pub fn with_mut<T: Entity, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut guard = self.write()?;
        let actual = guard.entity_type().name();
        let typed = guard
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(GraphError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                actual,
            })?;
        Ok(f(typed))
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for EntityHandle {}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_name = match self.inner.try_read() {
            Ok(guard) => guard.entity_type().short_name(),
            Err(_) => "<locked>",
        };
        write!(f, "EntityHandle({}@{:#x})", type_name, self.identity())
    }
}
