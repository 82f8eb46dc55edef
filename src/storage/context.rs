use super::registry::{EntityRegistration, TypeRegistry};
use super::table::RowTable;
use super::tracker::{ChangeTracker, EntryState, TrackedEntry};
use crate::context::PersistenceContext;
use crate::core::{
    EntityMetadata, EntityType, GraphError, KeyValue, RelationshipDescriptor, RelationshipKind,
    Result,
};
use crate::entity::{EntityHandle, EntityModel, Navigation};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Counters of the work a context performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub metadata_lookups: usize,
    pub queries: usize,
    pub collection_loads: usize,
    pub reference_loads: usize,
    pub detect_changes_runs: usize,
    /// Entries compared across all change detection runs.
    pub entries_scanned: usize,
}

/// Persistence context over an in-memory row store.
///
/// Instances are materialized through an identity map, so each stored row
/// has at most one live instance per context. Relationship loads resolve
/// foreign keys against the stored rows.
pub struct InMemoryContext {
    id: Uuid,
    registry: TypeRegistry,
    tables: HashMap<EntityType, RowTable>,
    tracker: ChangeTracker,
    auto_detect_changes: bool,
    failing_relationships: HashSet<String>,
    metadata_lookups: AtomicUsize,
    stats: ContextStats,
}

impl Default for InMemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            registry: TypeRegistry::new(),
            tables: HashMap::new(),
            tracker: ChangeTracker::new(),
            auto_detect_changes: true,
            failing_relationships: HashSet::new(),
            metadata_lookups: AtomicUsize::new(0),
            stats: ContextStats::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Maps `T` and creates its table.
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: EntityModel + Serialize + DeserializeOwned,
    {
        let registration = EntityRegistration::of::<T>();
        let metadata = &registration.metadata;
        self.tables
            .entry(metadata.entity_type)
            .or_insert_with(|| RowTable::new(&metadata.table_name, metadata.key_members.clone()));
        debug!(
            "context {}: registered '{}' as table '{}'",
            self.id, metadata.entity_type, metadata.table_name
        );
        self.registry.register(registration);
        self
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.registry.get(&EntityType::of::<T>()).is_some()
    }

    /// Stores `entity` as a row; live instances are not affected.
    pub fn insert_row<T>(&mut self, entity: &T) -> Result<()>
    where
        T: EntityModel + Serialize,
    {
        let entity_type = EntityType::of::<T>();
        self.registry.require(&entity_type)?;
        let row = serde_json::to_value(entity)?;
        self.table_mut(&entity_type)?.insert(row)?;
        Ok(())
    }

    pub fn row_count<T: 'static>(&self) -> usize {
        self.tables
            .get(&EntityType::of::<T>())
            .map(RowTable::len)
            .unwrap_or(0)
    }

    /// Loads one instance by its single key, without any relationships.
    pub fn find<T: EntityModel>(&mut self, key: impl Into<KeyValue>) -> Result<Option<EntityHandle>> {
        let entity_type = EntityType::of::<T>();
        self.registry.require(&entity_type)?.single_key()?;
        self.begin_query()?;

        let key = vec![key.into()];
        let row = self.table(&entity_type)?.find_by_key(&key).cloned();
        row.map(|row| self.materialize(&entity_type, row)).transpose()
    }

    /// Loads every stored instance of `T`, without any relationships.
    pub fn query_all<T: EntityModel>(&mut self) -> Result<Vec<EntityHandle>> {
        let entity_type = EntityType::of::<T>();
        self.registry.require(&entity_type)?;
        self.begin_query()?;

        let rows = self.table(&entity_type)?.rows().to_vec();
        rows.into_iter()
            .map(|row| self.materialize(&entity_type, row))
            .collect()
    }

    /// Starts tracking an instance built outside the context.
    pub fn attach(&mut self, entity: &EntityHandle) -> Result<()> {
        if self.tracker.entry(entity).is_some() {
            return Ok(());
        }

        let entity_type = entity.entity_type()?;
        let registration = self.registry.require(&entity_type)?;
        let (key, original) = {
            let guard = entity.read()?;
            let key = registration
                .metadata
                .key_members
                .iter()
                .map(|member| guard.property(member))
                .collect::<Result<Vec<_>>>()?;
            (key, registration.snapshot(&*guard)?)
        };
        self.tracker.track(entity.clone(), entity_type, key, original)
    }

    pub fn is_tracked(&self, entity: &EntityHandle) -> bool {
        self.tracker.entry(entity).is_some()
    }

    pub fn tracked_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn entry_state(&self, entity: &EntityHandle) -> Option<EntryState> {
        self.tracker.entry(entity).map(|entry| entry.state)
    }

    /// Tracking record of `entity`: key, state, attach and load times.
    pub fn entry(&self, entity: &EntityHandle) -> Option<&TrackedEntry> {
        self.tracker.entry(entity)
    }

    /// When the relationship was loaded for this instance, if it was.
    pub fn loaded_at(&self, entity: &EntityHandle, relationship: &str) -> Option<DateTime<Utc>> {
        self.tracker
            .entry(entity)
            .and_then(|entry| entry.loaded_at(relationship))
    }

    /// Compares tracked instances with their snapshots; returns the modified count.
    pub fn detect_changes(&mut self) -> Result<usize> {
        self.stats.detect_changes_runs += 1;
        self.stats.entries_scanned += self.tracker.len();
        self.tracker.detect_changes(&self.registry)
    }

    pub fn has_changes(&mut self) -> Result<bool> {
        Ok(self.detect_changes()? > 0)
    }

    pub fn accept_all_changes(&mut self) -> Result<()> {
        self.tracker.accept_all(&self.registry)
    }

    /// Makes every later load of `relationship` fail with a store error.
    pub fn fail_loads_of(&mut self, relationship: &str) {
        self.failing_relationships.insert(relationship.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failing_relationships.clear();
    }

    pub fn stats(&self) -> ContextStats {
        ContextStats {
            metadata_lookups: self.metadata_lookups.load(Ordering::Relaxed),
            ..self.stats
        }
    }

    pub fn reset_stats(&mut self) {
        self.metadata_lookups.store(0, Ordering::Relaxed);
        self.stats = ContextStats::default();
    }

    fn table(&self, entity_type: &EntityType) -> Result<&RowTable> {
        self.tables
            .get(entity_type)
            .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))
    }

    fn table_mut(&mut self, entity_type: &EntityType) -> Result<&mut RowTable> {
        self.tables
            .get_mut(entity_type)
            .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))
    }

    fn begin_query(&mut self) -> Result<()> {
        if self.auto_detect_changes {
            self.detect_changes()?;
        }
        self.stats.queries += 1;
        Ok(())
    }

    /// Returns the tracked instance for `row`, creating it on first sight.
    fn materialize(&mut self, entity_type: &EntityType, row: serde_json::Value) -> Result<EntityHandle> {
        let key = self.table(entity_type)?.row_key(&row)?;
        if let Some(existing) = self.tracker.find(entity_type, &key) {
            return Ok(existing.clone());
        }

        let registration = self.registry.require(entity_type)?;
        let handle = registration.materialize(row)?;
        let original = {
            let guard = handle.read()?;
            registration.snapshot(&*guard)?
        };
        self.tracker
            .track(handle.clone(), *entity_type, key, original)?;
        Ok(handle)
    }

    fn relationship(
        &self,
        entity: &EntityHandle,
        name: &str,
        kind: RelationshipKind,
    ) -> Result<(EntityType, RelationshipDescriptor)> {
        let entity_type = entity.entity_type()?;
        let registration = self.registry.require(&entity_type)?;
        let descriptor = registration
            .metadata
            .relationship(name)
            .ok_or_else(|| GraphError::property_not_found(entity_type.name(), name))?;
        if descriptor.kind != kind {
            return Err(GraphError::NavigationMismatch {
                type_name: entity_type.name().to_string(),
                relationship: name.to_string(),
                expected: kind.label(),
            });
        }
        Ok((entity_type, descriptor.clone()))
    }

    fn check_injected_failure(&self, entity_type: &EntityType, relationship: &str) -> Result<()> {
        if self.failing_relationships.contains(relationship) {
            warn!(
                "context {}: load of '{}.{}' failed (injected)",
                self.id,
                entity_type.short_name(),
                relationship
            );
            return Err(GraphError::Store(format!(
                "store unavailable while loading '{}'",
                relationship
            )));
        }
        Ok(())
    }
}

impl PersistenceContext for InMemoryContext {
    fn entity_metadata(&self, entity_type: &EntityType) -> Option<EntityMetadata> {
        self.metadata_lookups.fetch_add(1, Ordering::Relaxed);
        self.registry
            .get(entity_type)
            .map(|registration| registration.metadata.clone())
    }

    fn is_loaded(&self, entity: &EntityHandle, relationship: &str) -> Result<bool> {
        Ok(self.tracker.is_loaded(entity, relationship))
    }

    fn load_collection(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        let (owner_type, descriptor) =
            self.relationship(entity, relationship, RelationshipKind::Collection)?;
        self.check_injected_failure(&owner_type, relationship)?;
        self.attach(entity)?;
        self.begin_query()?;

        let owner_key = {
            let member = self.registry.require(&owner_type)?.single_key()?;
            entity.property(member)?
        };

        let target_type = descriptor.target;
        self.registry.require(&target_type)?;
        let rows: Vec<serde_json::Value> = {
            let table = self.table_mut(&target_type)?;
            table.ensure_index(descriptor.foreign_key)?;
            table
                .filter_by(descriptor.foreign_key, &owner_key)?
                .into_iter()
                .cloned()
                .collect()
        };

        let items = rows
            .into_iter()
            .map(|row| self.materialize(&target_type, row))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "context {}: loaded {} '{}' for {} ({})",
            self.id,
            items.len(),
            descriptor.name,
            owner_type.short_name(),
            owner_key
        );

        entity.set_navigation(descriptor.name, Navigation::Collection(items))?;
        self.tracker.mark_loaded(entity, descriptor.name)?;
        self.stats.collection_loads += 1;
        Ok(())
    }

    fn load_reference(&mut self, entity: &EntityHandle, relationship: &str) -> Result<()> {
        let (owner_type, descriptor) =
            self.relationship(entity, relationship, RelationshipKind::Reference)?;
        self.check_injected_failure(&owner_type, relationship)?;
        self.attach(entity)?;
        self.begin_query()?;

        let foreign_key = entity.property(descriptor.foreign_key)?;
        let target = if foreign_key.is_null() {
            None
        } else {
            let target_type = descriptor.target;
            self.registry.require(&target_type)?.single_key()?;
            let row = self
                .table(&target_type)?
                .find_by_key(std::slice::from_ref(&foreign_key))
                .cloned();
            row.map(|row| self.materialize(&target_type, row))
                .transpose()?
        };
        debug!(
            "context {}: loaded '{}' for {} ({})",
            self.id,
            descriptor.name,
            owner_type.short_name(),
            if target.is_some() { "found" } else { "none" }
        );

        entity.set_navigation(descriptor.name, Navigation::Reference(target))?;
        self.tracker.mark_loaded(entity, descriptor.name)?;
        self.stats.reference_loads += 1;
        Ok(())
    }

    fn auto_detect_changes_enabled(&self) -> bool {
        self.auto_detect_changes
    }

    fn set_auto_detect_changes_enabled(&mut self, enabled: bool) {
        self.auto_detect_changes = enabled;
    }
}
