//! In-memory persistence context.
//!
//! Stores rows per mapped type, materializes instances through an identity
//! map and loads relationships by foreign key.

pub mod context;
pub mod registry;
pub mod table;
pub mod tracker;

pub use context::{ContextStats, InMemoryContext};
pub use registry::{EntityRegistration, TypeRegistry};
pub use table::RowTable;
pub use tracker::{ChangeTracker, EntryState, TrackedEntry};
