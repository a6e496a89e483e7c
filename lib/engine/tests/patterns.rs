use crate::{engine, select, select_in_order, update};

const PEOPLE: &str = "INSERT DATA { ex:a ex:p \"1\" ; ex:mail \"m\" . ex:b ex:p \"2\" . ex:x ex:q ex:y }";

#[tokio::test]
async fn optional_values_may_stay_unbound() {
    let engine = engine();
    update(&engine, PEOPLE).await;

    let mails = select(
        &engine,
        "SELECT ?m WHERE { ?s ex:p ?o OPTIONAL { ?s ex:mail ?m } }",
        "m",
    )
    .await;
    assert_eq!(mails, vec!["\"m\"", "UNDEF"]);

    let without_mail = select(
        &engine,
        "SELECT ?s WHERE { ?s ex:p ?o OPTIONAL { ?s ex:mail ?m } FILTER(!BOUND(?m)) }",
        "s",
    )
    .await;
    assert_eq!(without_mail, vec!["<http://example.com/b>"]);
}

#[tokio::test]
async fn union_branches_pad_missing_variables() {
    let engine = engine();
    update(&engine, PEOPLE).await;

    let query = "SELECT ?a ?b WHERE { { ?a ex:p ?o } UNION { ?b ex:mail ?m } }";
    assert_eq!(
        select(&engine, query, "a").await,
        vec!["<http://example.com/a>", "<http://example.com/b>", "UNDEF"]
    );
    assert_eq!(
        select(&engine, query, "b").await,
        vec!["<http://example.com/a>", "UNDEF", "UNDEF"]
    );
}

#[tokio::test]
async fn minus_without_shared_variables_removes_nothing() {
    let engine = engine();
    update(&engine, PEOPLE).await;

    let subjects = select(
        &engine,
        "SELECT ?s WHERE { ?s ex:p ?o MINUS { ?x ex:q ?y } }",
        "s",
    )
    .await;
    assert_eq!(
        subjects,
        vec!["<http://example.com/a>", "<http://example.com/b>"]
    );

    let shared = select(
        &engine,
        "SELECT ?s WHERE { ?s ex:p ?o MINUS { ?s ex:mail ?m } }",
        "s",
    )
    .await;
    assert_eq!(shared, vec!["<http://example.com/b>"]);
}

#[tokio::test]
async fn values_join_with_stored_quads() {
    let engine = engine();
    update(&engine, PEOPLE).await;

    let objects = select(
        &engine,
        "SELECT ?o WHERE { VALUES ?s { ex:a ex:zz } ?s ex:p ?o }",
        "o",
    )
    .await;
    assert_eq!(objects, vec!["\"1\""]);

    let undef = select(
        &engine,
        "SELECT ?s WHERE { VALUES (?s ?o) { (UNDEF \"2\") } ?s ex:p ?o }",
        "s",
    )
    .await;
    assert_eq!(undef, vec!["<http://example.com/b>"]);
}

#[tokio::test]
async fn distinct_solutions_are_sorted_once() {
    let engine = engine();
    update(&engine, "INSERT DATA { ex:a ex:p \"1\", \"3\" . ex:b ex:p \"2\" }").await;

    let ascending = select_in_order(
        &engine,
        "SELECT DISTINCT ?s WHERE { ?s ex:p ?o } ORDER BY ?o",
        "s",
    )
    .await;
    assert_eq!(
        ascending,
        vec!["<http://example.com/a>", "<http://example.com/b>"]
    );

    let first = select_in_order(
        &engine,
        "SELECT DISTINCT ?s WHERE { ?s ex:p ?o } ORDER BY DESC(?o) LIMIT 1",
        "s",
    )
    .await;
    assert_eq!(first, vec!["<http://example.com/a>"]);

    let all = select_in_order(&engine, "SELECT ?s WHERE { ?s ex:p ?o } ORDER BY ?o", "s").await;
    assert_eq!(
        all,
        vec![
            "<http://example.com/a>",
            "<http://example.com/b>",
            "<http://example.com/a>"
        ]
    );
}

#[tokio::test]
async fn concat_of_an_unbound_value_is_unbound() {
    let engine = engine();
    update(&engine, PEOPLE).await;

    let values = select(
        &engine,
        "SELECT ?z WHERE { ?s ex:p ?o OPTIONAL { ?s ex:mail ?m } BIND(CONCAT(?m, \"!\") AS ?z) }",
        "z",
    )
    .await;
    assert_eq!(values, vec!["\"m!\"", "UNDEF"]);

    let before = select(
        &engine,
        "SELECT ?z WHERE { ?s ex:p ?o OPTIONAL { ?s ex:mail ?m } BIND(STRBEFORE(?m, \"x\") AS ?z) }",
        "z",
    )
    .await;
    assert_eq!(before, vec!["\"\"", "UNDEF"]);
}
