pub mod cache;
pub mod keys;

pub use cache::RelationshipCache;
pub use keys::{primary_key, primary_keys};
