use crate::{ask, engine, select, space, update, PREFIX};
use quadsql_common::QuadStore;
use quadsql_engine::{QueryEngine, QueryEvaluationError};
use quadsql_model::NamedNode;
use quadsql_storage::{MemQuadStore, StaticDocumentLoader};
use std::sync::Arc;

async fn graphs(engine: &QueryEngine) -> Vec<String> {
    let mut graphs = engine
        .store()
        .list_graphs(&space())
        .await
        .unwrap()
        .into_iter()
        .map(|graph| graph.to_string())
        .collect::<Vec<_>>();
    graphs.sort();
    graphs
}

async fn try_update(engine: &QueryEngine, update: &str) -> Result<(), QueryEvaluationError> {
    engine.update(&space(), &format!("{PREFIX}{update}")).await
}

#[tokio::test]
async fn insert_data_registers_named_graphs() {
    let engine = engine();
    update(&engine, "INSERT DATA { GRAPH ex:g { ex:a ex:p \"1\" } ex:a ex:p \"2\" }").await;

    assert_eq!(graphs(&engine).await, vec!["<http://example.com/g>"]);
}

#[tokio::test]
async fn delete_data_removes_quads() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:p \"1\" . ex:a ex:p \"2\" }").await;
    update(&engine, "DELETE DATA { ex:a ex:p \"1\" }").await;

    let values = select(&engine, "SELECT ?o WHERE { ex:a ex:p ?o }", "o").await;
    assert_eq!(values, vec!["\"2\""]);
}

#[tokio::test]
async fn delete_insert_rewrites_matching_quads() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:old \"1\" . ex:b ex:old \"2\" . ex:c ex:other \"3\" }").await;
    update(
        &engine,
        "DELETE { ?s ex:old ?o } INSERT { ?s ex:new ?o } WHERE { ?s ex:old ?o }",
    )
    .await;

    assert!(select(&engine, "SELECT ?o WHERE { ?s ex:old ?o }", "o").await.is_empty());
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { ?s ex:new ?o }", "o").await,
        vec!["\"1\"", "\"2\""]
    );
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { ?s ex:other ?o }", "o").await,
        vec!["\"3\""]
    );
}

#[tokio::test]
async fn insert_where_fills_named_graphs() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:p ex:b }").await;
    update(
        &engine,
        "INSERT { GRAPH ex:g { ?o ex:inverse ?s } } WHERE { ?s ex:p ?o }",
    )
    .await;

    assert!(ask(&engine, "ASK { GRAPH ex:g { ex:b ex:inverse ex:a } }").await);
    assert_eq!(graphs(&engine).await, vec!["<http://example.com/g>"]);
}

#[tokio::test]
async fn create_fails_for_existing_graphs() {
    let engine = engine();
    update(&engine, "CREATE GRAPH ex:g").await;

    let error = try_update(&engine, "CREATE GRAPH ex:g").await.unwrap_err();
    assert!(matches!(error, QueryEvaluationError::GraphAlreadyExists(_)));
    try_update(&engine, "CREATE SILENT GRAPH ex:g").await.unwrap();
}

#[tokio::test]
async fn drop_removes_quads_and_registration() {
    let engine = engine();
    update(&engine, "INSERT DATA { GRAPH ex:g { ex:a ex:p \"1\" } }").await;
    update(&engine, "DROP GRAPH ex:g").await;

    assert!(!ask(&engine, "ASK { GRAPH ex:g { ?s ?p ?o } }").await);
    assert!(graphs(&engine).await.is_empty());

    let error = try_update(&engine, "DROP GRAPH ex:g").await.unwrap_err();
    assert!(matches!(error, QueryEvaluationError::GraphDoesNotExist(_)));
    try_update(&engine, "DROP SILENT GRAPH ex:g").await.unwrap();
}

#[tokio::test]
async fn clear_keeps_the_registration() {
    let engine = engine();
    update(&engine, "INSERT DATA { GRAPH ex:g { ex:a ex:p \"1\" } }").await;
    update(&engine, "CLEAR GRAPH ex:g").await;

    assert!(!ask(&engine, "ASK { GRAPH ex:g { ?s ?p ?o } }").await);
    assert_eq!(graphs(&engine).await, vec!["<http://example.com/g>"]);

    update(&engine, "INSERT DATA { GRAPH ex:g { ex:a ex:p \"2\" } }").await;
    assert!(ask(&engine, "ASK { GRAPH ex:g { ex:a ex:p \"2\" } }").await);
}

#[tokio::test]
async fn clear_default_only_touches_the_global_graph() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:p \"1\" GRAPH ex:g { ex:a ex:p \"2\" } }").await;
    update(&engine, "CLEAR DEFAULT").await;

    assert_eq!(
        select(&engine, "SELECT ?o WHERE { ?s ?p ?o }", "o").await,
        vec!["\"2\""]
    );
}

#[tokio::test]
async fn drop_all_removes_everything() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:p \"1\" GRAPH ex:g { ex:a ex:p \"2\" } }").await;
    update(&engine, "DROP ALL").await;

    assert!(!ask(&engine, "ASK { ?s ?p ?o }").await);
    assert!(graphs(&engine).await.is_empty());
}

#[tokio::test]
async fn copy_add_and_move_transfer_quads() {
    let engine = engine();
    update(
        &engine,
        "INSERT DATA { GRAPH ex:a { ex:s ex:p \"a\" } GRAPH ex:b { ex:s ex:p \"b\" } }",
    )
    .await;

    update(&engine, "ADD ex:a TO ex:c").await;
    update(&engine, "COPY ex:b TO ex:c").await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { GRAPH ex:c { ?s ?p ?o } }", "o").await,
        vec!["\"b\""]
    );

    update(&engine, "MOVE ex:a TO ex:d").await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { GRAPH ex:d { ?s ?p ?o } }", "o").await,
        vec!["\"a\""]
    );
    assert_eq!(
        graphs(&engine).await,
        vec![
            "<http://example.com/b>",
            "<http://example.com/c>",
            "<http://example.com/d>"
        ]
    );
}

#[tokio::test]
async fn copies_from_the_default_graph_read_all_graphs() {
    let engine = engine();
    update(&engine, "INSERT DATA { GRAPH ex:g { ex:a ex:p \"1\" } }").await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { ?s ?p ?o }", "o").await,
        vec!["\"1\""]
    );

    update(
        &engine,
        "INSERT { GRAPH ex:h { ?s ?p ?o } } WHERE { ?s ?p ?o }",
    )
    .await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { GRAPH ex:h { ?s ?p ?o } }", "o").await,
        vec!["\"1\""]
    );

    update(&engine, "COPY DEFAULT TO ex:k").await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { GRAPH ex:k { ?s ?p ?o } }", "o").await,
        vec!["\"1\""]
    );
}

#[tokio::test]
async fn load_parses_documents_into_the_destination() {
    let loader = Arc::new(StaticDocumentLoader::new());
    loader.insert(
        NamedNode::new("http://example.com/data.nt").unwrap(),
        Some("application/n-triples"),
        "<http://example.com/a> <http://example.com/p> \"loaded\" .\n",
    );
    let engine = QueryEngine::new(Arc::new(MemQuadStore::new())).with_loader(loader);

    update(&engine, "LOAD <http://example.com/data.nt> INTO GRAPH ex:g").await;
    assert_eq!(
        select(&engine, "SELECT ?o WHERE { GRAPH ex:g { ?s ?p ?o } }", "o").await,
        vec!["\"loaded\""]
    );

    let error = try_update(&engine, "LOAD <http://example.com/missing.nt>")
        .await
        .unwrap_err();
    assert!(matches!(error, QueryEvaluationError::Storage(_)));
    try_update(&engine, "LOAD SILENT <http://example.com/missing.nt>")
        .await
        .unwrap();
}

#[tokio::test]
async fn load_requires_a_document_loader() {
    let engine = engine();

    let error = try_update(&engine, "LOAD <http://example.com/data.nt>")
        .await
        .unwrap_err();
    assert!(matches!(error, QueryEvaluationError::NoDocumentLoader(_)));
}
