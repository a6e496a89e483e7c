//! Compilation of property paths.
//!
//! Paths that are not a plain predicate, sequence or inverse are compiled into a *relation*, a
//! `SELECT` with the columns `start_id` and `end_id` (plus `graph_id` inside `GRAPH ?g`). Quantified
//! paths become recursive common table expressions over the relation of their operand.

use crate::alias::{AliasGenerator, AliasKind};
use crate::compiled::CompiledPattern;
use crate::error::TranslationResult;
use crate::pattern::{Endpoint, PatternCompiler};
use crate::scope::Scope;
use crate::sql::{and_all, FALSE_CONDITION};
use quadsql_model::algebra::PropertyPathExpression;
use quadsql_model::schema::{CONTEXT_UUID, OBJECT_UUID, PREDICATE_UUID, SUBJECT_UUID, TERM_UUID};
use quadsql_model::{NamedNode, TermKey};

/// A bound endpoint that restricts the start of a recursion.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Seed {
    None,
    /// The id literal of the subject.
    Start(String),
    /// The id literal of the object.
    End(String),
}

impl Seed {
    fn reversed(&self) -> Seed {
        match self {
            Seed::None => Seed::None,
            Seed::Start(id) => Seed::End(id.clone()),
            Seed::End(id) => Seed::Start(id.clone()),
        }
    }

    fn start(&self) -> Seed {
        match self {
            Seed::Start(id) => Seed::Start(id.clone()),
            Seed::None | Seed::End(_) => Seed::None,
        }
    }

    fn end(&self) -> Seed {
        match self {
            Seed::End(id) => Seed::End(id.clone()),
            Seed::None | Seed::Start(_) => Seed::None,
        }
    }
}

impl PatternCompiler<'_> {
    /// Compiles `subject path object`.
    pub(crate) fn compile_path(
        &self,
        subject: &Endpoint,
        path: &PropertyPathExpression,
        object: &Endpoint,
        scope: &Scope,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        match path {
            PropertyPathExpression::NamedNode(predicate) => {
                let alias = aliases.next(AliasKind::Quad);
                let mut pattern = CompiledPattern {
                    from: vec![format!("{} AS {alias}", self.tables.quad_table)],
                    ..CompiledPattern::default()
                };
                let predicate = Endpoint::Constant(TermKey::from(predicate));
                self.bind_endpoint(&mut pattern, subject, format!("{alias}.{SUBJECT_UUID}"));
                self.bind_endpoint(&mut pattern, &predicate, format!("{alias}.{PREDICATE_UUID}"));
                self.bind_endpoint(&mut pattern, object, format!("{alias}.{OBJECT_UUID}"));
                pattern
                    .where_conditions
                    .extend(scope.quad_conditions(&alias));
                if let Some(graph) = scope.graph_variable() {
                    pattern.bind_id(graph, format!("{alias}.{CONTEXT_UUID}"));
                }
                Ok(pattern)
            }
            PropertyPathExpression::Reverse(inner) => {
                self.compile_path(object, inner, subject, scope, aliases)
            }
            PropertyPathExpression::Sequence(left, right) => {
                let middle = Endpoint::Var(aliases.hidden_variable());
                let left = self.compile_path(subject, left, &middle, scope, &mut aliases.child())?;
                let right =
                    self.compile_path(&middle, right, object, scope, &mut aliases.child())?;
                self.merge_join(left, right, aliases)
            }
            PropertyPathExpression::Alternative(..)
            | PropertyPathExpression::ZeroOrMore(_)
            | PropertyPathExpression::OneOrMore(_)
            | PropertyPathExpression::ZeroOrOne(_)
            | PropertyPathExpression::NegatedPropertySet(_) => {
                let seed = match (subject, object) {
                    (Endpoint::Constant(key), _) => {
                        self.constant_id(key).map_or(Seed::None, Seed::Start)
                    }
                    (_, Endpoint::Constant(key)) => {
                        self.constant_id(key).map_or(Seed::None, Seed::End)
                    }
                    _ => Seed::None,
                };
                let relation = self.path_relation(path, scope, aliases, &seed)?;
                let alias = aliases.next(AliasKind::Path);
                let mut pattern = CompiledPattern {
                    from: vec![format!("({relation}) AS {alias}")],
                    ..CompiledPattern::default()
                };
                self.bind_endpoint(&mut pattern, subject, format!("{alias}.start_id"));
                self.bind_endpoint(&mut pattern, object, format!("{alias}.end_id"));
                if let Some(graph) = scope.graph_variable() {
                    pattern.bind_id(graph, format!("{alias}.graph_id"));
                }
                Ok(pattern)
            }
        }
    }

    /// Returns the `SELECT` of the relation of `path`.
    fn path_relation(
        &self,
        path: &PropertyPathExpression,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        seed: &Seed,
    ) -> TranslationResult<String> {
        let graph = scope.graph_variable().is_some();
        let graph_column = |alias: &str, column: &str| {
            if graph {
                format!(", {alias}.{column} AS graph_id")
            } else {
                String::new()
            }
        };
        match path {
            PropertyPathExpression::NamedNode(predicate) => {
                let quad = aliases.next(AliasKind::Quad);
                let mut conditions = vec![match self.constant_id(&TermKey::from(predicate)) {
                    Some(id) => format!("{quad}.{PREDICATE_UUID} = {id}"),
                    None => FALSE_CONDITION.to_owned(),
                }];
                conditions.extend(scope.quad_conditions(&quad));
                match seed {
                    Seed::Start(id) => conditions.push(format!("{quad}.{SUBJECT_UUID} = {id}")),
                    Seed::End(id) => conditions.push(format!("{quad}.{OBJECT_UUID} = {id}")),
                    Seed::None => {}
                }
                Ok(format!(
                    "SELECT {quad}.{SUBJECT_UUID} AS start_id, {quad}.{OBJECT_UUID} AS end_id{} FROM {} AS {quad} WHERE {}",
                    graph_column(&quad, CONTEXT_UUID),
                    self.tables.quad_table,
                    and_all(&conditions)
                ))
            }
            PropertyPathExpression::Reverse(inner) => {
                let inner = self.path_relation(inner, scope, aliases, &seed.reversed())?;
                let alias = aliases.next(AliasKind::Subquery);
                Ok(format!(
                    "SELECT {alias}.end_id AS start_id, {alias}.start_id AS end_id{} FROM ({inner}) AS {alias}",
                    graph_column(&alias, "graph_id")
                ))
            }
            PropertyPathExpression::Sequence(left, right) => {
                let left = self.path_relation(left, scope, aliases, &seed.start())?;
                let right = self.path_relation(right, scope, aliases, &seed.end())?;
                let (l, r) = (
                    aliases.next(AliasKind::Subquery),
                    aliases.next(AliasKind::Subquery),
                );
                let same_graph = if graph {
                    format!(" AND {l}.graph_id = {r}.graph_id")
                } else {
                    String::new()
                };
                Ok(format!(
                    "SELECT {l}.start_id AS start_id, {r}.end_id AS end_id{} FROM ({left}) AS {l} JOIN ({right}) AS {r} ON {l}.end_id = {r}.start_id{same_graph}",
                    graph_column(&l, "graph_id")
                ))
            }
            PropertyPathExpression::Alternative(left, right) => {
                let left = self.path_relation(left, scope, aliases, seed)?;
                let right = self.path_relation(right, scope, aliases, seed)?;
                let alias = aliases.next(AliasKind::Union);
                Ok(format!(
                    "SELECT {alias}.start_id AS start_id, {alias}.end_id AS end_id{} FROM (({left}) UNION ALL ({right})) AS {alias}",
                    graph_column(&alias, "graph_id")
                ))
            }
            PropertyPathExpression::OneOrMore(inner) => {
                self.transitive_closure(inner, scope, aliases, seed)
            }
            PropertyPathExpression::ZeroOrMore(inner) => {
                let zero = self.zero_length(scope, aliases, seed);
                let more = self.transitive_closure(inner, scope, aliases, seed)?;
                Ok(distinct_union(&zero, &more, graph, aliases))
            }
            PropertyPathExpression::ZeroOrOne(inner) => {
                let zero = self.zero_length(scope, aliases, seed);
                let one = self.path_relation(inner, scope, aliases, seed)?;
                Ok(distinct_union(&zero, &one, graph, aliases))
            }
            PropertyPathExpression::NegatedPropertySet(predicates) => {
                Ok(self.negated_property_set(predicates, scope, aliases, seed))
            }
        }
    }

    /// `WITH RECURSIVE` over the relation of `inner`.
    ///
    /// A seeded recursion starts at the seed and extends away from it. The recursive part is a
    /// `UNION ALL` that counts its steps and stops after
    /// [max_path_length](crate::TranslationOptions::max_path_length) of them, so cycles terminate.
    /// Duplicates are removed outside of the recursion.
    fn transitive_closure(
        &self,
        inner: &PropertyPathExpression,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        seed: &Seed,
    ) -> TranslationResult<String> {
        let graph = scope.graph_variable().is_some();
        let base = self.path_relation(inner, scope, aliases, seed)?;
        let step = self.path_relation(inner, scope, aliases, &Seed::None)?;
        let cte = aliases.next(AliasKind::Recursive);
        let (b, s) = (
            aliases.next(AliasKind::Subquery),
            aliases.next(AliasKind::Subquery),
        );
        let (columns, graph_select, graph_step, same_graph) = if graph {
            (
                "start_id, end_id, graph_id",
                format!(", {b}.graph_id"),
                format!(", {cte}.graph_id"),
                format!(" AND {s}.graph_id = {cte}.graph_id"),
            )
        } else {
            ("start_id, end_id", String::new(), String::new(), String::new())
        };
        let bound = self.options.max_path_length;
        let recursive_step = match seed {
            Seed::End(_) => format!(
                "SELECT {s}.start_id, {cte}.end_id{graph_step}, {cte}.depth + 1 FROM {cte} JOIN ({step}) AS {s} ON {s}.end_id = {cte}.start_id{same_graph} WHERE {cte}.depth < {bound}"
            ),
            Seed::None | Seed::Start(_) => format!(
                "SELECT {cte}.start_id, {s}.end_id{graph_step}, {cte}.depth + 1 FROM {cte} JOIN ({step}) AS {s} ON {s}.start_id = {cte}.end_id{same_graph} WHERE {cte}.depth < {bound}"
            ),
        };
        Ok(format!(
            "WITH RECURSIVE {cte}({columns}, depth) AS (SELECT {b}.start_id, {b}.end_id{graph_select}, 1 FROM ({base}) AS {b} UNION ALL {recursive_step}) SELECT DISTINCT {columns} FROM {cte}"
        ))
    }

    /// The zero-length path relation, every node reaches itself.
    ///
    /// A seeded relation only contains the seed, otherwise every subject and object in scope.
    fn zero_length(&self, scope: &Scope, aliases: &mut AliasGenerator, seed: &Seed) -> String {
        let graph = scope.graph_variable().is_some();
        match seed {
            Seed::Start(id) | Seed::End(id) if !graph => {
                let term = aliases.next(AliasKind::Term);
                format!(
                    "SELECT {term}.{TERM_UUID} AS start_id, {term}.{TERM_UUID} AS end_id FROM {} AS {term} WHERE {term}.{TERM_UUID} = {id}",
                    self.tables.term_table
                )
            }
            _ => {
                let [subjects, objects] = [SUBJECT_UUID, OBJECT_UUID].map(|column| {
                    let quad = aliases.next(AliasKind::Quad);
                    let mut conditions = scope.quad_conditions(&quad);
                    match seed {
                        Seed::Start(id) | Seed::End(id) => {
                            conditions.push(format!("{quad}.{column} = {id}"));
                        }
                        Seed::None => {}
                    }
                    let graph_column = if graph {
                        format!(", {quad}.{CONTEXT_UUID} AS graph_id")
                    } else {
                        String::new()
                    };
                    let filter = if conditions.is_empty() {
                        String::new()
                    } else {
                        format!(" WHERE {}", and_all(&conditions))
                    };
                    format!(
                        "SELECT {quad}.{column} AS start_id, {quad}.{column} AS end_id{graph_column} FROM {} AS {quad}{filter}",
                        self.tables.quad_table
                    )
                });
                format!("({subjects}) UNION ({objects})")
            }
        }
    }

    /// `!(p1|...|pn)`: pairs of distinct terms that are not connected by any of the predicates.
    fn negated_property_set(
        &self,
        predicates: &[NamedNode],
        scope: &Scope,
        aliases: &mut AliasGenerator,
        seed: &Seed,
    ) -> String {
        let (start, end) = (aliases.next(AliasKind::Term), aliases.next(AliasKind::Term));
        let mut from = vec![
            format!("{} AS {start}", self.tables.term_table),
            format!("{} AS {end}", self.tables.term_table),
        ];
        let mut conditions = vec![format!("{start}.{TERM_UUID} <> {end}.{TERM_UUID}")];
        match seed {
            Seed::Start(id) => conditions.push(format!("{start}.{TERM_UUID} = {id}")),
            Seed::End(id) => conditions.push(format!("{end}.{TERM_UUID} = {id}")),
            Seed::None => {}
        }

        let graphs = scope.graph_variable().map(|_| {
            let quad = aliases.next(AliasKind::Quad);
            let alias = aliases.next(AliasKind::Subquery);
            let conditions = scope.quad_conditions(&quad);
            let filter = if conditions.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", and_all(&conditions))
            };
            from.push(format!(
                "(SELECT DISTINCT {quad}.{CONTEXT_UUID} AS graph_id FROM {} AS {quad}{filter}) AS {alias}",
                self.tables.quad_table
            ));
            alias
        });

        for predicate in predicates {
            // A predicate that is not stored never connects anything.
            let Some(id) = self.constant_id(&TermKey::from(predicate)) else {
                continue;
            };
            let quad = aliases.next(AliasKind::Quad);
            let mut edge = vec![
                format!("{quad}.{SUBJECT_UUID} = {start}.{TERM_UUID}"),
                format!("{quad}.{OBJECT_UUID} = {end}.{TERM_UUID}"),
                format!("{quad}.{PREDICATE_UUID} = {id}"),
            ];
            match &graphs {
                Some(graphs) => edge.push(format!("{quad}.{CONTEXT_UUID} = {graphs}.graph_id")),
                None => edge.extend(scope.quad_conditions(&quad)),
            }
            conditions.push(format!(
                "NOT EXISTS (SELECT 1 FROM {} AS {quad} WHERE {})",
                self.tables.quad_table,
                and_all(&edge)
            ));
        }

        let graph_column = graphs
            .map(|graphs| format!(", {graphs}.graph_id AS graph_id"))
            .unwrap_or_default();
        format!(
            "SELECT {start}.{TERM_UUID} AS start_id, {end}.{TERM_UUID} AS end_id{graph_column} FROM {} WHERE {}",
            from.join(" CROSS JOIN "),
            and_all(&conditions)
        )
    }
}

fn distinct_union(left: &str, right: &str, graph: bool, aliases: &mut AliasGenerator) -> String {
    let alias = aliases.next(AliasKind::Union);
    let graph_column = if graph {
        format!(", {alias}.graph_id AS graph_id")
    } else {
        String::new()
    };
    format!(
        "SELECT DISTINCT {alias}.start_id AS start_id, {alias}.end_id AS end_id{graph_column} FROM (({left}) UNION ({right})) AS {alias}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TranslationOptions;
    use crate::resolved::ResolvedTerms;
    use quadsql_model::{SpaceId, TableConfig};

    #[test]
    fn seeds_follow_the_direction_of_the_path() {
        let seed = Seed::Start("'a'".to_owned());
        assert_eq!(seed.reversed(), Seed::End("'a'".to_owned()));
        assert_eq!(seed.end(), Seed::None);
        assert_eq!(seed.start(), seed);
    }

    #[test]
    fn unknown_predicates_never_match() {
        let tables = TableConfig::for_space(&SpaceId::new("test").unwrap());
        let terms = ResolvedTerms::default();
        let options = TranslationOptions::default();
        let compiler = PatternCompiler::new(&tables, &terms, &options);
        let relation = compiler
            .path_relation(
                &PropertyPathExpression::NamedNode(NamedNode::new_unchecked("http://example.com/p")),
                &Scope::default(),
                &mut AliasGenerator::new(),
                &Seed::None,
            )
            .unwrap();
        insta::assert_snapshot!(relation, @"SELECT q0.subject_uuid AS start_id, q0.object_uuid AS end_id FROM test_rdf_quad AS q0 WHERE 1 = 0");
    }
}
