use crate::{translate, translate_with};
use quadsql_translation::TranslationOptions;
use quadsql_translation::sql::check_aliases;

#[test]
fn sequences_join_through_a_hidden_variable() {
    let translated = translate(
        "SELECT ?s ?o WHERE { ?s <http://example.com/a>/<http://example.com/b> ?o }",
    )
    .unwrap();
    assert!(!translated.sql.contains("RECURSIVE"));
    assert!(translated.sql.contains(".object_uuid = "));
    assert!(check_aliases(&translated.sql).is_ok());
}

#[test]
fn inverse_paths_swap_the_endpoints() {
    let translated =
        translate("SELECT ?s WHERE { ?s ^<http://example.com/parent> <http://example.com/x> }")
            .unwrap();
    assert!(translated.sql.contains("q0.subject_uuid = '"));
}

#[test]
fn one_or_more_is_a_recursive_closure() {
    let translated = translate(
        "SELECT ?o WHERE { <http://example.com/a> <http://example.com/p>+ ?o }",
    )
    .unwrap();
    assert!(translated.sql.contains("WITH RECURSIVE r0(start_id, end_id, depth) AS"));
    // The recursion starts at the bound subject.
    assert!(translated.sql.contains("q0.subject_uuid = '"));
    assert!(check_aliases(&translated.sql).is_ok());
}

#[test]
fn recursion_is_bounded_and_deduplicated_outside() {
    let translated = translate_with(
        "SELECT ?o WHERE { ?s <http://example.com/p>+ ?o }",
        TranslationOptions::default().with_max_path_length(5),
        true,
    )
    .unwrap();
    assert!(translated.sql.contains(" UNION ALL SELECT r0.start_id, "));
    assert!(translated.sql.contains(".end_id, r0.depth + 1 FROM r0 JOIN ("));
    assert!(translated.sql.contains("WHERE r0.depth < 5)"));
    assert!(translated.sql.contains(") SELECT DISTINCT start_id, end_id FROM r0"));
    assert!(!translated.sql.contains(" UNION SELECT"));
}

#[test]
fn zero_or_more_includes_the_start_node() {
    let translated = translate(
        "SELECT ?o WHERE { <http://example.com/a> <http://example.com/p>* ?o }",
    )
    .unwrap();
    assert!(translated.sql.contains("WITH RECURSIVE"));
    assert!(translated.sql.contains("test_term AS t0 WHERE t0.term_uuid = '"));
}

#[test]
fn zero_or_one_does_not_recurse() {
    let translated =
        translate("SELECT ?s ?o WHERE { ?s <http://example.com/p>? ?o }").unwrap();
    assert!(!translated.sql.contains("RECURSIVE"));
    assert!(translated.sql.contains(") UNION ("));
}

#[test]
fn quantified_sequences_recurse_over_the_sequence() {
    let translated = translate(
        "SELECT ?o WHERE { ?s (<http://example.com/a>/<http://example.com/b>)+ ?o }",
    )
    .unwrap();
    assert!(translated.sql.contains("WITH RECURSIVE"));
    assert!(translated.sql.contains(".end_id = "));
    assert!(check_aliases(&translated.sql).is_ok());
}

#[test]
fn alternatives_are_unioned() {
    let translated = translate(
        "SELECT ?o WHERE { ?s (<http://example.com/a>|<http://example.com/b>) ?o }",
    )
    .unwrap();
    assert!(translated.sql.contains(") UNION ALL ("));
}

#[test]
fn negated_property_sets_exclude_self_pairs() {
    let translated = translate(
        "SELECT ?s ?o WHERE { ?s !(<http://example.com/a>|<http://example.com/b>) ?o }",
    )
    .unwrap();
    assert!(translated.sql.contains("t0.term_uuid <> t1.term_uuid"));
    assert_eq!(translated.sql.matches("NOT EXISTS").count(), 2);
}

#[test]
fn paths_inside_graph_variables_carry_the_graph() {
    let translated = translate(
        "SELECT ?g ?o WHERE { GRAPH ?g { ?s <http://example.com/p>+ ?o } }",
    )
    .unwrap();
    assert!(translated.sql.contains("r0(start_id, end_id, graph_id, depth)"));
    assert!(translated.sql.contains("pp0.graph_id"));
}
