use crate::{example_quad, example_quad_in_graph, space};
use quadsql_common::error::StorageError;
use quadsql_common::QuadStore;
use quadsql_storage::MemQuadStore;

#[tokio::test]
async fn test_execute_sql_over_term_and_quad_tables() {
    let store = MemQuadStore::new();
    store
        .write_quads_batch(&space(), vec![example_quad("1"), example_quad("2")])
        .await
        .unwrap();

    let rows = store
        .execute_sql(
            &space(),
            "SELECT t0.term_text AS \"c0\", t0.lang AS \"c0__lang\" \
             FROM test_rdf_quad AS q0 JOIN test_term AS t0 ON t0.term_uuid = q0.object_uuid \
             ORDER BY \"c0\"",
        )
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["c0".to_owned(), "c0__lang".to_owned()]);
    assert_eq!(
        rows.rows,
        vec![
            vec![Some("1".to_owned()), None],
            vec![Some("2".to_owned()), None],
        ]
    );
}

#[tokio::test]
async fn test_execute_sql_keeps_columns_of_empty_results() {
    let store = MemQuadStore::new();
    let rows = store
        .execute_sql(&space(), "SELECT q0.subject_uuid AS \"c0__id\" FROM test_rdf_quad AS q0")
        .await
        .unwrap();
    assert_eq!(rows.columns, vec!["c0__id".to_owned()]);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_execute_sql_counts_per_graph() {
    let store = MemQuadStore::new();
    store
        .write_quads_batch(
            &space(),
            vec![
                example_quad_in_graph("a", "http://example.com/g1"),
                example_quad_in_graph("b", "http://example.com/g1"),
                example_quad("c"),
            ],
        )
        .await
        .unwrap();

    let rows = store
        .execute_sql(
            &space(),
            "SELECT t0.term_text AS g, COUNT(*) AS n FROM test_rdf_quad AS q0 \
             JOIN test_term AS t0 ON t0.term_uuid = q0.context_uuid \
             GROUP BY t0.term_text ORDER BY g",
        )
        .await
        .unwrap();
    insta::assert_debug_snapshot!(rows.rows, @r#"
    [
        [
            Some(
                "http://example.com/g1",
            ),
            Some(
                "2",
            ),
        ],
        [
            Some(
                "urn:___GLOBAL",
            ),
            Some(
                "1",
            ),
        ],
    ]
    "#);
}

#[tokio::test]
async fn test_invalid_sql_is_an_execution_error() {
    let store = MemQuadStore::new();
    let error = store
        .execute_sql(&space(), "SELECT nope FROM missing_table")
        .await
        .unwrap_err();
    assert!(matches!(error, StorageError::Execution { .. }));
}
