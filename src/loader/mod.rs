//! Eager graph loader.
//!
//! Walks every relationship reachable from the given roots, depth first, and
//! asks the persistence context to load each one that is not yet resident.
//! Each root-level call runs with automatic change detection suspended.

mod config;

pub use config::{LoaderConfig, VisitIdentity};

use crate::context::{ChangeTrackingGuard, PersistenceContext};
use crate::core::{
    EntityType, GraphError, KeyValue, RelationshipDescriptor, RelationshipKind, Result,
};
use crate::entity::{Entity, EntityHandle, Navigation};
use crate::metadata::RelationshipCache;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use tracing::{Level, event, info_span};

/// Counters describing one root-level call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub roots: usize,
    pub entities_visited: usize,
    pub collection_loads: usize,
    pub reference_loads: usize,
    /// Relationships skipped because the context reported them resident.
    pub already_loaded: usize,
    /// Instances reached again through another edge and not re-walked.
    pub revisits_skipped: usize,
}

impl LoadReport {
    pub fn total_loads(&self) -> usize {
        self.collection_loads + self.reference_loads
    }
}

#[derive(Debug, Clone)]
pub struct GraphLoader {
    config: LoaderConfig,
    cache: Arc<RelationshipCache>,
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphLoader {
    /// Loader with default settings backed by the process-wide cache.
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            cache: Arc::clone(RelationshipCache::global()),
        }
    }

    /// Replaces the relationship cache, e.g. to isolate a test.
    pub fn with_cache(mut self, cache: Arc<RelationshipCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<RelationshipCache> {
        &self.cache
    }

    /// Hydrates `entity` in place and hands the same handle back.
    pub fn load<C: PersistenceContext + ?Sized>(
        &self,
        context: &mut C,
        entity: Option<EntityHandle>,
    ) -> Result<Option<EntityHandle>> {
        if let Some(root) = &entity {
            self.run(context, std::iter::once(root))?;
        }
        Ok(entity)
    }

    /// Hydrates every present element; length, order and empty slots are kept.
    pub fn load_list<C: PersistenceContext + ?Sized>(
        &self,
        context: &mut C,
        entities: Vec<Option<EntityHandle>>,
    ) -> Result<Vec<Option<EntityHandle>>> {
        self.run(context, entities.iter().flatten())?;
        Ok(entities)
    }

    /// Typed variant of [`GraphLoader::load_list`] for a homogeneous list.
    pub fn load_typed<C, T>(
        &self,
        context: &mut C,
        entities: Vec<Option<Arc<RwLock<T>>>>,
    ) -> Result<Vec<Option<Arc<RwLock<T>>>>>
    where
        C: PersistenceContext + ?Sized,
        T: Entity,
    {
        let handles: Vec<EntityHandle> = entities
            .iter()
            .flatten()
            .map(|entity| EntityHandle::from_arc(Arc::clone(entity)))
            .collect();
        self.run(context, handles.iter())?;
        Ok(entities)
    }

    /// Hydrates `roots` and reports what the walk did.
    pub fn load_with_report<C: PersistenceContext + ?Sized>(
        &self,
        context: &mut C,
        roots: &[EntityHandle],
    ) -> Result<LoadReport> {
        self.run(context, roots.iter())
    }

    fn run<'r, C, I>(&self, context: &mut C, roots: I) -> Result<LoadReport>
    where
        C: PersistenceContext + ?Sized,
        I: IntoIterator<Item = &'r EntityHandle>,
    {
        let mut roots = roots.into_iter().peekable();
        if roots.peek().is_none() {
            return Ok(LoadReport::default());
        }

        let span = info_span!(
            "graph.load",
            suspend_change_tracking = self.config.suspend_change_tracking,
            cycle_guard = self.config.cycle_guard
        );
        let _enter = span.enter();

        let mut walk = Walk {
            config: &self.config,
            cache: &self.cache,
            visited: HashSet::new(),
            key_members: HashMap::new(),
            report: LoadReport::default(),
        };

        let outcome = if self.config.suspend_change_tracking {
            let mut guard = ChangeTrackingGuard::suspend(context);
            walk.visit_roots(&mut *guard, roots)
        } else {
            walk.visit_roots(context, roots)
        };

        match outcome {
            Ok(()) => {
                let report = walk.report;
                event!(
                    Level::DEBUG,
                    roots = report.roots,
                    visited = report.entities_visited,
                    loads = report.total_loads(),
                    "graph load complete"
                );
                Ok(report)
            }
            Err(err) => {
                event!(Level::ERROR, error = %err, "graph load failed");
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VisitKey {
    Instance(TypeId, usize),
    Key(TypeId, Vec<KeyValue>),
}

/// State for one root-level call.
struct Walk<'a> {
    config: &'a LoaderConfig,
    cache: &'a RelationshipCache,
    visited: HashSet<VisitKey>,
    key_members: HashMap<TypeId, Vec<&'static str>>,
    report: LoadReport,
}

impl Walk<'_> {
    fn visit_roots<'r, C, I>(&mut self, context: &mut C, roots: I) -> Result<()>
    where
        C: PersistenceContext + ?Sized,
        I: Iterator<Item = &'r EntityHandle>,
    {
        for root in roots {
            self.report.roots += 1;
            self.visit(context, root, 0)?;
        }
        Ok(())
    }

    fn visit<C: PersistenceContext + ?Sized>(
        &mut self,
        context: &mut C,
        entity: &EntityHandle,
        depth: usize,
    ) -> Result<()> {
        let entity_type = entity.entity_type()?;
        if self.config.cycle_guard {
            let key = self.visit_key(context, entity, &entity_type)?;
            if !self.visited.insert(key) {
                self.report.revisits_skipped += 1;
                event!(Level::TRACE, entity_type = %entity_type, "instance already visited");
                return Ok(());
            }
        }

        // Revisits are skipped above, so only unseen instances count against the limit.
        if let Some(limit) = self.config.max_depth
            && depth > limit
        {
            return Err(GraphError::DepthLimitExceeded(limit));
        }
        self.report.entities_visited += 1;

        let relationships = self.cache.relationships_for(&*context, &entity_type)?;
        for relationship in relationships.iter() {
            if context.is_loaded(entity, relationship.name)? {
                self.report.already_loaded += 1;
                continue;
            }

            match relationship.kind {
                RelationshipKind::Collection => {
                    self.load_collection(context, entity, &entity_type, relationship, depth)?
                }
                RelationshipKind::Reference => {
                    self.load_reference(context, entity, &entity_type, relationship, depth)?
                }
            }
        }
        Ok(())
    }

    fn visit_key<C: PersistenceContext + ?Sized>(
        &mut self,
        context: &C,
        entity: &EntityHandle,
        entity_type: &EntityType,
    ) -> Result<VisitKey> {
        let instance = VisitKey::Instance(entity_type.id(), entity.identity());
        if self.config.visit_identity == VisitIdentity::Instance {
            return Ok(instance);
        }

        if !self.key_members.contains_key(&entity_type.id()) {
            let metadata = context
                .entity_metadata(entity_type)
                .ok_or_else(|| GraphError::TypeNotMapped(entity_type.name().to_string()))?;
            self.key_members
                .insert(entity_type.id(), metadata.key_members);
        }

        let members = &self.key_members[&entity_type.id()];
        if members.is_empty() {
            return Ok(instance);
        }

        let guard = entity.read()?;
        let values = members
            .iter()
            .map(|member| guard.property(member))
            .collect::<Result<Vec<_>>>()?;
        Ok(VisitKey::Key(entity_type.id(), values))
    }

    fn load_collection<C: PersistenceContext + ?Sized>(
        &mut self,
        context: &mut C,
        entity: &EntityHandle,
        entity_type: &EntityType,
        relationship: &RelationshipDescriptor,
        depth: usize,
    ) -> Result<()> {
        event!(
            Level::DEBUG,
            entity_type = %entity_type,
            relationship = relationship.name,
            depth,
            "loading collection"
        );
        context.load_collection(entity, relationship.name)?;
        self.report.collection_loads += 1;

        let elements = entity
            .navigation(relationship.name)?
            .into_collection()
            .ok_or_else(|| mismatch(entity_type, relationship))?;
        for element in &elements {
            self.visit(context, element, depth + 1)?;
        }
        Ok(())
    }

    fn load_reference<C: PersistenceContext + ?Sized>(
        &mut self,
        context: &mut C,
        entity: &EntityHandle,
        entity_type: &EntityType,
        relationship: &RelationshipDescriptor,
        depth: usize,
    ) -> Result<()> {
        event!(
            Level::DEBUG,
            entity_type = %entity_type,
            relationship = relationship.name,
            depth,
            "loading reference"
        );
        context.load_reference(entity, relationship.name)?;
        self.report.reference_loads += 1;

        let target = entity
            .navigation(relationship.name)?
            .into_reference()
            .ok_or_else(|| mismatch(entity_type, relationship))?;
        if let Some(target) = &target {
            self.visit(context, target, depth + 1)?;
        }
        entity.set_navigation(relationship.name, Navigation::Reference(target))
    }
}

fn mismatch(entity_type: &EntityType, relationship: &RelationshipDescriptor) -> GraphError {
    GraphError::NavigationMismatch {
        type_name: entity_type.name().to_string(),
        relationship: relationship.name.to_string(),
        expected: relationship.kind.label(),
    }
}

/// Hydrates `entity` with a default [`GraphLoader`].
pub fn load_graph<C: PersistenceContext + ?Sized>(
    context: &mut C,
    entity: Option<EntityHandle>,
) -> Result<Option<EntityHandle>> {
    GraphLoader::new().load(context, entity)
}

/// Hydrates every present element of an untyped list.
pub fn load_graph_list<C: PersistenceContext + ?Sized>(
    context: &mut C,
    entities: Vec<Option<EntityHandle>>,
) -> Result<Vec<Option<EntityHandle>>> {
    GraphLoader::new().load_list(context, entities)
}

/// Hydrates every present element of a homogeneous typed list.
pub fn load_graph_typed<C, T>(
    context: &mut C,
    entities: Vec<Option<Arc<RwLock<T>>>>,
) -> Result<Vec<Option<Arc<RwLock<T>>>>>
where
    C: PersistenceContext + ?Sized,
    T: Entity,
{
    GraphLoader::new().load_typed(context, entities)
}
