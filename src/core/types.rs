use std::any::TypeId;
use std::fmt;

/// Runtime identity of an entity's concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityType {
    id: TypeId,
    name: &'static str,
}

impl EntityType {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Last path segment of the type name.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// Targets at most one related entity.
    Reference,
    /// Targets a collection of related entities.
    Collection,
}

impl RelationshipKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Collection => "collection",
        }
    }
}

/// One named navigation on an entity type.
///
/// `foreign_key` names the member holding the join value: on the owner for
/// references, on the target for collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipDescriptor {
    pub owner: &'static str,
    pub name: &'static str,
    pub kind: RelationshipKind,
    pub target: EntityType,
    pub foreign_key: &'static str,
}

impl RelationshipDescriptor {
    pub fn reference(
        owner: EntityType,
        name: &'static str,
        target: EntityType,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            owner: owner.name(),
            name,
            kind: RelationshipKind::Reference,
            target,
            foreign_key,
        }
    }

    pub fn collection(
        owner: EntityType,
        name: &'static str,
        target: EntityType,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            owner: owner.name(),
            name,
            kind: RelationshipKind::Collection,
            target,
            foreign_key,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind == RelationshipKind::Collection
    }
}

/// Mapping metadata the persistence context holds for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    pub entity_type: EntityType,
    pub table_name: String,
    /// Key members in declaration order.
    pub key_members: Vec<&'static str>,
    /// Relationships in declaration order.
    pub relationships: Vec<RelationshipDescriptor>,
}

impl EntityMetadata {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            table_name: entity_type.short_name().to_lowercase(),
            key_members: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn table(mut self, table_name: &str) -> Self {
        self.table_name = table_name.to_string();
        self
    }

    pub fn key(mut self, member: &'static str) -> Self {
        self.key_members.push(member);
        self
    }

    pub fn reference(mut self, name: &'static str, target: EntityType, foreign_key: &'static str) -> Self {
        self.relationships.push(RelationshipDescriptor::reference(
            self.entity_type,
            name,
            target,
            foreign_key,
        ));
        self
    }

    pub fn collection(mut self, name: &'static str, target: EntityType, foreign_key: &'static str) -> Self {
        self.relationships.push(RelationshipDescriptor::collection(
            self.entity_type,
            name,
            target,
            foreign_key,
        ));
        self
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}
