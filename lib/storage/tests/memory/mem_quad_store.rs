use crate::{example_quad, example_quad_in_graph, space};
use quadsql_common::QuadStore;
use quadsql_model::vocab::GLOBAL_GRAPH;
use quadsql_model::{Literal, NamedNode, TermKey, TermRef};
use quadsql_storage::MemQuadStore;

#[tokio::test]
async fn test_insert_quad() {
    let store = MemQuadStore::new();

    let inserted = store
        .write_quads_batch(&space(), vec![example_quad("value")])
        .await
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(store.len(&space()).await, 1);
}

#[tokio::test]
async fn test_insert_duplicate_quads_no_effect() {
    let store = MemQuadStore::new();

    store
        .write_quads_batch(&space(), vec![example_quad("value")])
        .await
        .unwrap();
    let inserted = store
        .write_quads_batch(&space(), vec![example_quad("value"), example_quad("value")])
        .await
        .unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn test_spaces_are_isolated() {
    let store = MemQuadStore::new();
    let other = quadsql_model::SpaceId::new("other").unwrap();

    store
        .write_quads_batch(&space(), vec![example_quad("value")])
        .await
        .unwrap();
    assert!(store.is_empty(&other).await);
    assert_eq!(
        store.table_config(&other).quad_table,
        "other_rdf_quad".to_owned()
    );
}

#[tokio::test]
async fn test_resolve_terms_returns_only_stored_terms() {
    let store = MemQuadStore::new();
    store
        .write_quads_batch(&space(), vec![example_quad("value")])
        .await
        .unwrap();

    let stored = TermKey::from(TermRef::from(Literal::new_simple_literal("value").as_ref()));
    let missing = TermKey::iri("http://example.com/missing");
    let global = TermKey::iri(GLOBAL_GRAPH.as_str());
    let resolved = store
        .resolve_terms_batch(&space(), &[stored.clone(), missing.clone(), global.clone()])
        .await
        .unwrap();
    assert_eq!(resolved.len(), 2);
    assert!(resolved.contains_key(&stored));
    assert!(resolved.contains_key(&global));
    assert!(!resolved.contains_key(&missing));

    let again = store
        .resolve_terms_batch(&space(), &[stored.clone()])
        .await
        .unwrap();
    assert_eq!(again[&stored], resolved[&stored]);
}

#[tokio::test]
async fn test_remove_quad() {
    let store = MemQuadStore::new();
    let quad = example_quad_in_graph("value", "http://example.com/g");

    store
        .write_quads_batch(&space(), vec![quad.clone()])
        .await
        .unwrap();
    let removed = store
        .remove_quads_batch(&space(), vec![quad, example_quad("unknown")])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.is_empty(&space()).await);
}

#[tokio::test]
async fn test_graph_registry() {
    let store = MemQuadStore::new();
    let g1 = NamedNode::new("http://example.com/g1").unwrap();
    let g2 = NamedNode::new("http://example.com/g2").unwrap();

    store
        .register_graphs(&space(), &[g1.clone(), g1.clone()])
        .await
        .unwrap();
    let registered = store
        .registered_graphs(&space(), &[g1.clone(), g2.clone()])
        .await
        .unwrap();
    assert!(registered.contains(&g1));
    assert!(!registered.contains(&g2));
    assert_eq!(store.list_graphs(&space()).await.unwrap(), vec![g1.clone()]);

    assert!(store.unregister_graph(&space(), &g1).await.unwrap());
    assert!(!store.unregister_graph(&space(), &g1).await.unwrap());
    assert!(store.list_graphs(&space()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_graph() {
    let store = MemQuadStore::new();
    let g1 = "http://example.com/g1";
    let g2 = "http://example.com/g2";

    store
        .write_quads_batch(
            &space(),
            vec![
                example_quad_in_graph("a", g1),
                example_quad_in_graph("b", g1),
                example_quad_in_graph("a", g2),
            ],
        )
        .await
        .unwrap();
    let removed = store
        .clear_graph_quads(&space(), &NamedNode::new(g1).unwrap())
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.len(&space()).await, 1);
}

#[tokio::test]
async fn test_copy_between_graphs() {
    let store = MemQuadStore::new();
    let source = NamedNode::new("http://example.com/source").unwrap();
    let target = NamedNode::new("http://example.com/target").unwrap();

    store
        .write_quads_batch(
            &space(),
            vec![
                example_quad_in_graph("a", source.as_str()),
                example_quad_in_graph("b", source.as_str()),
                example_quad_in_graph("a", target.as_str()),
            ],
        )
        .await
        .unwrap();
    let copied = store
        .copy_quads_between_graphs(&space(), &source, &target)
        .await
        .unwrap();
    assert_eq!(copied, 1);
    assert_eq!(store.len(&space()).await, 4);
}
