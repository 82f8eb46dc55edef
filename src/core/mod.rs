pub mod error;
pub mod types;
pub mod value;

pub use error::{GraphError, Result};
pub use types::{EntityMetadata, EntityType, RelationshipDescriptor, RelationshipKind};
pub use value::KeyValue;
