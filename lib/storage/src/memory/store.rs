use crate::memory::space::SpaceData;
use crate::memory::tables::{quad_batch, term_batch, to_rows, QUAD_SCHEMA, TERM_SCHEMA};
use async_trait::async_trait;
use dashmap::DashMap;
use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::datasource::MemTable;
use datafusion::error::DataFusionError;
use datafusion::prelude::SessionContext;
use itertools::Itertools;
use quadsql_common::error::StorageError;
use quadsql_common::{QuadStore, SqlRows};
use quadsql_model::{
    GraphNameRef, NamedNode, Quad, QuadRef, SpaceId, TableConfig, TermId, TermKey,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A memory-based [QuadStore].
///
/// Every space is guarded by its own lock. SQL statements see a consistent snapshot of the space
/// they run against.
#[derive(Debug, Default)]
pub struct MemQuadStore {
    spaces: DashMap<SpaceId, Arc<RwLock<SpaceData>>>,
}

impl MemQuadStore {
    /// Creates a new empty [MemQuadStore].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of quads stored in `space`.
    pub async fn len(&self, space: &SpaceId) -> usize {
        self.space(space).read().await.len()
    }

    /// Returns true if `space` holds no quads.
    pub async fn is_empty(&self, space: &SpaceId) -> bool {
        self.len(space).await == 0
    }

    fn space(&self, space: &SpaceId) -> Arc<RwLock<SpaceData>> {
        Arc::clone(self.spaces.entry(space.clone()).or_default().value())
    }

    async fn snapshot(&self, space: &SpaceId) -> Result<(RecordBatch, RecordBatch), StorageError> {
        let data = self.space(space);
        let data = data.read().await;
        let terms = term_batch(&data).map_err(StorageError::other)?;
        let quads = quad_batch(&data).map_err(StorageError::other)?;
        Ok((terms, quads))
    }
}

#[async_trait]
impl QuadStore for MemQuadStore {
    fn table_config(&self, space: &SpaceId) -> TableConfig {
        TableConfig::for_space(space)
    }

    async fn resolve_terms_batch(
        &self,
        space: &SpaceId,
        keys: &[TermKey],
    ) -> Result<HashMap<TermKey, TermId>, StorageError> {
        let data = self.space(space);
        let data = data.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| Some((key.clone(), data.lookup(key)?)))
            .collect())
    }

    async fn registered_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<HashSet<NamedNode>, StorageError> {
        let data = self.space(space);
        let data = data.read().await;
        Ok(graphs
            .iter()
            .filter(|graph| data.graphs().contains(*graph))
            .cloned()
            .collect())
    }

    async fn register_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<(), StorageError> {
        let data = self.space(space);
        let mut data = data.write().await;
        for graph in graphs {
            if data.register(graph.clone()) {
                tracing::debug!(space = %space, graph = %graph, "Registered graph");
            }
        }
        Ok(())
    }

    async fn unregister_graph(
        &self,
        space: &SpaceId,
        graph: &NamedNode,
    ) -> Result<bool, StorageError> {
        let data = self.space(space);
        let removed = data.write().await.unregister(graph);
        Ok(removed)
    }

    async fn list_graphs(&self, space: &SpaceId) -> Result<Vec<NamedNode>, StorageError> {
        let data = self.space(space);
        let graphs = data.read().await.graphs().iter().cloned().collect_vec();
        Ok(graphs)
    }

    async fn write_quads_batch(
        &self,
        space: &SpaceId,
        quads: Vec<Quad>,
    ) -> Result<usize, StorageError> {
        let data = self.space(space);
        let mut data = data.write().await;
        let inserted = quads
            .iter()
            .filter(|quad| data.insert(QuadRef::from(*quad)))
            .count();
        tracing::debug!(space = %space, requested = quads.len(), inserted, "Wrote quads");
        Ok(inserted)
    }

    async fn remove_quads_batch(
        &self,
        space: &SpaceId,
        quads: Vec<Quad>,
    ) -> Result<usize, StorageError> {
        let data = self.space(space);
        let mut data = data.write().await;
        let removed = quads
            .iter()
            .filter(|quad| data.remove(QuadRef::from(*quad)))
            .count();
        tracing::debug!(space = %space, requested = quads.len(), removed, "Removed quads");
        Ok(removed)
    }

    async fn clear_graph_quads(
        &self,
        space: &SpaceId,
        graph: &NamedNode,
    ) -> Result<usize, StorageError> {
        let data = self.space(space);
        let removed = data.write().await.clear(GraphNameRef::NamedNode(graph.as_ref()));
        Ok(removed)
    }

    async fn copy_quads_between_graphs(
        &self,
        space: &SpaceId,
        source: &NamedNode,
        target: &NamedNode,
    ) -> Result<usize, StorageError> {
        let data = self.space(space);
        let copied = data.write().await.copy(
            GraphNameRef::NamedNode(source.as_ref()),
            GraphNameRef::NamedNode(target.as_ref()),
        );
        Ok(copied)
    }

    async fn execute_sql(&self, space: &SpaceId, sql: &str) -> Result<SqlRows, StorageError> {
        let tables = self.table_config(space);
        let (terms, quads) = self.snapshot(space).await?;

        let execution_error = |error: DataFusionError| StorageError::Execution {
            message: error.to_string(),
            sql: sql.to_owned(),
        };
        let context = SessionContext::new();
        context
            .register_table(tables.term_table.as_str(), mem_table(&TERM_SCHEMA, terms)?)
            .map_err(execution_error)?;
        context
            .register_table(tables.quad_table.as_str(), mem_table(&QUAD_SCHEMA, quads)?)
            .map_err(execution_error)?;

        let frame = context.sql(sql).await.map_err(execution_error)?;
        let columns = frame
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        let batches = frame.collect().await.map_err(execution_error)?;
        let rows = to_rows(columns, &batches).map_err(StorageError::other)?;
        tracing::debug!(space = %space, rows = rows.len(), "Executed SQL");
        Ok(rows)
    }
}

fn mem_table(schema: &SchemaRef, batch: RecordBatch) -> Result<Arc<MemTable>, StorageError> {
    MemTable::try_new(Arc::clone(schema), vec![vec![batch]])
        .map(Arc::new)
        .map_err(StorageError::other)
}
