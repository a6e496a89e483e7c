use crate::space;
use async_trait::async_trait;
use quadsql_common::error::StorageError;
use quadsql_common::{QuadStore, SqlRows};
use quadsql_engine::QueryEngine;
use quadsql_model::{NamedNode, Quad, SpaceId, TableConfig, TermId, TermKey};
use quadsql_storage::MemQuadStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts the term resolutions that reach the store.
#[derive(Default)]
struct CountingStore {
    inner: MemQuadStore,
    resolutions: AtomicUsize,
}

#[async_trait]
impl QuadStore for CountingStore {
    fn table_config(&self, space: &SpaceId) -> TableConfig {
        self.inner.table_config(space)
    }

    async fn resolve_terms_batch(
        &self,
        space: &SpaceId,
        keys: &[TermKey],
    ) -> Result<HashMap<TermKey, TermId>, StorageError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve_terms_batch(space, keys).await
    }

    async fn registered_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<HashSet<NamedNode>, StorageError> {
        self.inner.registered_graphs(space, graphs).await
    }

    async fn register_graphs(
        &self,
        space: &SpaceId,
        graphs: &[NamedNode],
    ) -> Result<(), StorageError> {
        self.inner.register_graphs(space, graphs).await
    }

    async fn unregister_graph(
        &self,
        space: &SpaceId,
        graph: &NamedNode,
    ) -> Result<bool, StorageError> {
        self.inner.unregister_graph(space, graph).await
    }

    async fn list_graphs(&self, space: &SpaceId) -> Result<Vec<NamedNode>, StorageError> {
        self.inner.list_graphs(space).await
    }

    async fn write_quads_batch(
        &self,
        space: &SpaceId,
        quads: Vec<Quad>,
    ) -> Result<usize, StorageError> {
        self.inner.write_quads_batch(space, quads).await
    }

    async fn remove_quads_batch(
        &self,
        space: &SpaceId,
        quads: Vec<Quad>,
    ) -> Result<usize, StorageError> {
        self.inner.remove_quads_batch(space, quads).await
    }

    async fn clear_graph_quads(
        &self,
        space: &SpaceId,
        graph: &NamedNode,
    ) -> Result<usize, StorageError> {
        self.inner.clear_graph_quads(space, graph).await
    }

    async fn copy_quads_between_graphs(
        &self,
        space: &SpaceId,
        source: &NamedNode,
        target: &NamedNode,
    ) -> Result<usize, StorageError> {
        self.inner
            .copy_quads_between_graphs(space, source, target)
            .await
    }

    async fn execute_sql(&self, space: &SpaceId, sql: &str) -> Result<SqlRows, StorageError> {
        self.inner.execute_sql(space, sql).await
    }
}

#[tokio::test]
async fn resolved_terms_are_cached_across_queries() {
    let store = Arc::new(CountingStore::default());
    let engine = QueryEngine::new(Arc::<CountingStore>::clone(&store));
    engine
        .update(
            &space(),
            "INSERT DATA { <http://example.com/a> <http://example.com/p> \"1\" }",
        )
        .await
        .unwrap();

    let query = "SELECT ?o WHERE { <http://example.com/a> <http://example.com/p> ?o }";
    engine.query(&space(), query).await.unwrap();
    assert_eq!(store.resolutions.load(Ordering::SeqCst), 1);
    assert_eq!(engine.resolver().cached(&space()), 3);

    engine.query(&space(), query).await.unwrap();
    assert_eq!(store.resolutions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_terms_are_looked_up_again() {
    let store = Arc::new(CountingStore::default());
    let engine = QueryEngine::new(Arc::<CountingStore>::clone(&store));

    let query = "SELECT ?o WHERE { <http://example.com/a> <http://example.com/p> ?o }";
    engine.query(&space(), query).await.unwrap();
    engine.query(&space(), query).await.unwrap();
    assert_eq!(store.resolutions.load(Ordering::SeqCst), 2);
    assert_eq!(engine.resolver().cached(&space()), 0);
}
