//! Common imports for code that maps entities and loads graphs.

pub use crate::{
    Entity, EntityHandle, EntityModel, GraphError, GraphLoader, InMemoryContext, KeyValue,
    LoaderConfig, Navigation, PersistenceContext, Result, load_graph, load_graph_list,
    load_graph_typed, primary_key, primary_keys,
};
