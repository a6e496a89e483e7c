use futures::TryStreamExt;
use quadsql_engine::{QueryEngine, QueryResults};
use quadsql_model::{SpaceId, Triple};
use quadsql_storage::MemQuadStore;
use std::sync::Arc;

mod aggregates;
mod patterns;
mod resolver;
mod update;

const PREFIX: &str = "PREFIX ex: <http://example.com/> ";

fn space() -> SpaceId {
    SpaceId::new("test").unwrap()
}

fn engine() -> QueryEngine {
    QueryEngine::new(Arc::new(MemQuadStore::new()))
}

async fn update(engine: &QueryEngine, update: &str) {
    engine
        .update(&space(), &format!("{PREFIX}{update}"))
        .await
        .unwrap();
}

/// Returns the sorted values of `variable`. Unbound values are rendered as `UNDEF`.
async fn select(engine: &QueryEngine, query: &str, variable: &str) -> Vec<String> {
    let mut values = select_in_order(engine, query, variable).await;
    values.sort();
    values
}

/// Returns the values of `variable` in the order of the solutions.
async fn select_in_order(engine: &QueryEngine, query: &str, variable: &str) -> Vec<String> {
    let QueryResults::Solutions(solutions) = engine
        .query(&space(), &format!("{PREFIX}{query}"))
        .await
        .unwrap()
    else {
        panic!("Expected solutions");
    };
    solutions
        .map_ok(|solution| {
            solution
                .get(variable)
                .map_or_else(|| "UNDEF".to_owned(), ToString::to_string)
        })
        .try_collect::<Vec<_>>()
        .await
        .unwrap()
}

async fn ask(engine: &QueryEngine, query: &str) -> bool {
    let QueryResults::Boolean(result) = engine
        .query(&space(), &format!("{PREFIX}{query}"))
        .await
        .unwrap()
    else {
        panic!("Expected a boolean");
    };
    result
}

async fn triples(engine: &QueryEngine, query: &str) -> Vec<Triple> {
    let QueryResults::Graph(triples) = engine
        .query(&space(), &format!("{PREFIX}{query}"))
        .await
        .unwrap()
    else {
        panic!("Expected a graph");
    };
    triples.collect_triples().await.unwrap()
}
