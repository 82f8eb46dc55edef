// ============================================================================
// graph_hydrate Library
// ============================================================================

//! Eager object-graph materialization.
//!
//! Given entities a persistence context has already partially loaded,
//! [`load_graph`] walks every relationship reachable from them and has the
//! context fetch each one that is not resident yet, leaving a fully hydrated
//! graph behind.
//!
//! ```
//! use graph_hydrate::{Entity, EntityHandle, InMemoryContext, load_graph};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Entity)]
//! struct Blog {
//!     #[key]
//!     id: i64,
//!     #[serde(skip)]
//!     #[collection(target = Post, foreign_key = "blog_id")]
//!     posts: Vec<EntityHandle>,
//! }
//!
//! #[derive(Serialize, Deserialize, Entity)]
//! struct Post {
//!     #[key]
//!     id: i64,
//!     blog_id: i64,
//! }
//!
//! # fn main() -> graph_hydrate::Result<()> {
//! let mut ctx = InMemoryContext::new();
//! ctx.register::<Blog>().register::<Post>();
//! ctx.insert_row(&Blog { id: 1, posts: Vec::new() })?;
//! ctx.insert_row(&Post { id: 10, blog_id: 1 })?;
//!
//! let blog = ctx.find::<Blog>(1)?;
//! let blog = load_graph(&mut ctx, blog)?.expect("blog 1 exists");
//! assert_eq!(blog.with(|b: &Blog| b.posts.len())?, 1);
//! # Ok(())
//! # }
//! ```

extern crate self as graph_hydrate;

pub mod context;
pub mod core;
pub mod entity;
pub mod loader;
pub mod metadata;
pub mod prelude;
pub mod storage;

pub use crate::core::{
    EntityMetadata, EntityType, GraphError, KeyValue, RelationshipDescriptor, RelationshipKind,
    Result,
};
pub use context::{ChangeTrackingGuard, PersistenceContext};
pub use entity::{Entity, EntityHandle, EntityModel, Navigation, ToKeyValue};
pub use graph_hydrate_derive::Entity;
pub use loader::{
    GraphLoader, LoadReport, LoaderConfig, VisitIdentity, load_graph, load_graph_list,
    load_graph_typed,
};
pub use metadata::{RelationshipCache, primary_key, primary_keys};
pub use storage::{ContextStats, EntryState, InMemoryContext};
