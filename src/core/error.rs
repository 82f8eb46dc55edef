use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Type '{0}' is not mapped in the persistence context")]
    TypeNotMapped(String),

    #[error("Invalid key metadata for '{type_name}': {message}")]
    KeyMetadata { type_name: String, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Property '{property}' not found on '{type_name}'")]
    PropertyNotFound { type_name: String, property: String },

    #[error("Relationship '{relationship}' on '{type_name}' is not a {expected} navigation")]
    NavigationMismatch {
        type_name: String,
        relationship: String,
        expected: &'static str,
    },

    #[error("Type mismatch: expected '{expected}', found '{actual}'")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Entity of type '{0}' is not tracked by this context")]
    EntityNotTracked(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Graph depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

impl<T> From<std::sync::PoisonError<T>> for GraphError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl GraphError {
    pub(crate) fn property_not_found(type_name: &str, property: &str) -> Self {
        Self::PropertyNotFound {
            type_name: type_name.to_string(),
            property: property.to_string(),
        }
    }
}
