use crate::alias::{AliasGenerator, AliasKind};
use crate::compiled::CompiledPattern;
use crate::error::TranslationResult;
use crate::pattern::{Endpoint, PatternCompiler, Projection};
use crate::scope::Scope;
use crate::sql::FALSE_CONDITION;
use quadsql_model::algebra_term::TriplePattern;
use quadsql_model::schema::{CONTEXT_UUID, OBJECT_UUID, PREDICATE_UUID, SUBJECT_UUID};
use std::collections::BTreeSet;

impl PatternCompiler<'_> {
    /// Compiles a basic graph pattern into one quad-table instance per triple.
    ///
    /// Triples are ordered greedily: constants first, then triples that share a variable with
    /// the triples that are already placed.
    pub(crate) fn compile_bgp(
        &self,
        triples: &[TriplePattern],
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        if triples.is_empty() {
            return Ok(CompiledPattern::unit(aliases));
        }

        let mut pattern = CompiledPattern::default();
        for triple in order_triples(triples) {
            let alias = aliases.next(AliasKind::Quad);
            pattern
                .from
                .push(format!("{} AS {alias}", self.tables.quad_table));
            let positions = [
                (Endpoint::from_term_pattern(&triple.subject), SUBJECT_UUID),
                (
                    Endpoint::from_named_node_pattern(&triple.predicate),
                    PREDICATE_UUID,
                ),
                (Endpoint::from_term_pattern(&triple.object), OBJECT_UUID),
            ];
            for (endpoint, column) in positions {
                self.bind_endpoint(&mut pattern, &endpoint, format!("{alias}.{column}"));
            }
            pattern
                .where_conditions
                .extend(scope.quad_conditions(&alias));
            if let Some(graph) = scope.graph_variable() {
                pattern.bind_id(graph, format!("{alias}.{CONTEXT_UUID}"));
            }
        }

        let keys = pattern
            .var_keys()
            .into_iter()
            .filter(|k| projection.contains(k))
            .collect::<Vec<_>>();
        pattern.materialize_all(&keys, self.tables, aliases);
        Ok(pattern)
    }

    /// Binds `endpoint` to the id column `column`.
    ///
    /// Constants that are not stored make the whole pattern fail.
    pub(crate) fn bind_endpoint(
        &self,
        pattern: &mut CompiledPattern,
        endpoint: &Endpoint,
        column: String,
    ) {
        match endpoint {
            Endpoint::Constant(key) => match self.constant_id(key) {
                Some(id) => pattern.where_conditions.push(format!("{column} = {id}")),
                None => {
                    tracing::debug!(term = ?key, "Constant is not stored");
                    pattern.where_conditions.push(FALSE_CONDITION.to_owned());
                }
            },
            Endpoint::Var(key) => pattern.bind_id(key, column),
        }
    }
}

/// Orders the triples of a BGP so that each triple is as selective as possible given the ones
/// before it.
fn order_triples(triples: &[TriplePattern]) -> Vec<&TriplePattern> {
    let mut remaining = triples.iter().collect::<Vec<_>>();
    let mut bound = BTreeSet::new();
    let mut ordered = Vec::with_capacity(triples.len());
    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_score = (0, 0);
        for (i, triple) in remaining.iter().enumerate() {
            let endpoints = endpoints(triple);
            let constants = endpoints
                .iter()
                .filter(|e| matches!(e, Endpoint::Constant(_)))
                .count();
            let joined = endpoints
                .iter()
                .filter(|e| matches!(e, Endpoint::Var(v) if bound.contains(v)))
                .count();
            let score = (constants + joined, constants);
            if i == 0 || score > best_score {
                best = i;
                best_score = score;
            }
        }
        let triple = remaining.remove(best);
        for endpoint in endpoints(triple) {
            if let Endpoint::Var(v) = endpoint {
                bound.insert(v);
            }
        }
        ordered.push(triple);
    }
    ordered
}

fn endpoints(triple: &TriplePattern) -> [Endpoint; 3] {
    [
        Endpoint::from_term_pattern(&triple.subject),
        Endpoint::from_named_node_pattern(&triple.predicate),
        Endpoint::from_term_pattern(&triple.object),
    ]
}
