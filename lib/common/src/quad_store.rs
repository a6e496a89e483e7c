use crate::error::StorageError;
use crate::SqlRows;
use async_trait::async_trait;
use quadsql_model::{NamedNode, Quad, SpaceId, TableConfig, TermId, TermKey};
use std::collections::{HashMap, HashSet};

/// The storage collaborator of the engine.
///
/// All methods operate on a single space. Graphs are addressed by IRI. The default graph of the
/// RDF data model is stored as [GLOBAL_GRAPH](quadsql_model::vocab::GLOBAL_GRAPH), so callers map
/// it before reaching the store.
#[async_trait]
pub trait QuadStore: Send + Sync {
    /// Returns the physical table names of `space`.
    fn table_config(&self, space: &SpaceId) -> TableConfig;

    /// Looks up the ids of `keys`.
    ///
    /// The result only contains the keys that are stored. A missing key is an expected outcome and
    /// not an error.
    async fn resolve_terms_batch(
        &self,
        space: &SpaceId,
        keys: &[TermKey],
    ) -> Result<HashMap<TermKey, TermId>, StorageError>;

    /// Returns the subset of `graphs` that is registered in `space`.
    async fn registered_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<HashSet<NamedNode>, StorageError>;

    /// Registers the given graphs. Already registered graphs are left untouched.
    async fn register_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<(), StorageError>;

    /// Removes the registration of `graph`. Returns whether the graph was registered.
    async fn unregister_graph(&self, space: &SpaceId, graph: &NamedNode)
        -> Result<bool, StorageError>;

    /// Returns all registered graphs of `space`.
    async fn list_graphs(&self, space: &SpaceId) -> Result<Vec<NamedNode>, StorageError>;

    /// Inserts the given quads, interning their terms. Returns the number of new quads.
    ///
    /// Quads in the default graph are written to the global graph.
    async fn write_quads_batch(&self, space: &SpaceId, quads: Vec<Quad>)
        -> Result<usize, StorageError>;

    /// Removes the given quads. Returns the number of removed quads.
    async fn remove_quads_batch(
        &self,
        space: &SpaceId,
        quads: Vec<Quad>,
    ) -> Result<usize, StorageError>;

    /// Removes every quad of `graph` but keeps its registration. Returns the number of removed
    /// quads.
    async fn clear_graph_quads(&self, space: &SpaceId, graph: &NamedNode)
        -> Result<usize, StorageError>;

    /// Copies every quad of `source` into `target` by term id. Returns the number of new quads in
    /// `target`.
    async fn copy_quads_between_graphs(
        &self,
        space: &SpaceId,
        source: &NamedNode,
        target: &NamedNode,
    ) -> Result<usize, StorageError>;

    /// Executes a read-only SQL statement and returns its rows rendered as text.
    async fn execute_sql(&self, space: &SpaceId, sql: &str) -> Result<SqlRows, StorageError>;
}
