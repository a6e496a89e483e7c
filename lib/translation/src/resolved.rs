use crate::sql::quote_literal;
use quadsql_model::algebra::{
    Expression, GraphPattern, OrderExpression, PropertyPathExpression, QueryDataset,
};
use quadsql_model::algebra_term::{NamedNodePattern, TermPattern, TriplePattern};
use quadsql_model::vocab::GLOBAL_GRAPH;
use quadsql_model::{Query, TermId, TermKey, TermRef};
use std::collections::{BTreeSet, HashMap};

/// The ids of the terms that are bound in an algebra tree.
///
/// Terms missing from the map are not stored. Patterns that require them cannot match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedTerms {
    ids: HashMap<TermKey, TermId>,
}

impl ResolvedTerms {
    pub fn new(ids: HashMap<TermKey, TermId>) -> Self {
        Self { ids }
    }

    pub fn get(&self, key: &TermKey) -> Option<TermId> {
        self.ids.get(key).copied()
    }

    /// Returns the id of `key` as an SQL literal.
    pub fn id_literal(&self, key: &TermKey) -> Option<String> {
        self.get(key).map(|id| quote_literal(&id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Collects every bound term of `query` whose id is needed for translating it.
///
/// The global graph is always included.
pub fn collect_query_terms(query: &Query) -> BTreeSet<TermKey> {
    let mut terms = BTreeSet::from([TermKey::from(GLOBAL_GRAPH)]);
    let (dataset, pattern) = match query {
        Query::Select {
            dataset, pattern, ..
        }
        | Query::Construct {
            dataset, pattern, ..
        }
        | Query::Describe {
            dataset, pattern, ..
        }
        | Query::Ask {
            dataset, pattern, ..
        } => (dataset, pattern),
    };
    if let Some(dataset) = dataset {
        collect_dataset_terms(dataset, &mut terms);
    }
    collect_pattern_terms(pattern, &mut terms);
    terms
}

/// Collects the graph names of a dataset clause.
pub fn collect_dataset_terms(dataset: &QueryDataset, terms: &mut BTreeSet<TermKey>) {
    terms.extend(dataset.default.iter().map(TermKey::from));
    if let Some(named) = &dataset.named {
        terms.extend(named.iter().map(TermKey::from));
    }
}

/// Collects the bound terms of a graph pattern, including nested `EXISTS` patterns.
pub fn collect_pattern_terms(pattern: &GraphPattern, terms: &mut BTreeSet<TermKey>) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            for triple in patterns {
                collect_triple_terms(triple, terms);
            }
        }
        GraphPattern::Path {
            subject,
            path,
            object,
        } => {
            collect_term_pattern(subject, terms);
            collect_path_terms(path, terms);
            collect_term_pattern(object, terms);
        }
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            collect_pattern_terms(left, terms);
            collect_pattern_terms(right, terms);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            collect_pattern_terms(left, terms);
            collect_pattern_terms(right, terms);
            if let Some(expression) = expression {
                collect_expression_terms(expression, terms);
            }
        }
        GraphPattern::Filter { expr, inner } => {
            collect_expression_terms(expr, terms);
            collect_pattern_terms(inner, terms);
        }
        GraphPattern::Graph { name, inner } => {
            if let NamedNodePattern::NamedNode(name) = name {
                terms.insert(TermKey::from(name));
            }
            collect_pattern_terms(inner, terms);
        }
        GraphPattern::Extend {
            inner, expression, ..
        } => {
            collect_pattern_terms(inner, terms);
            collect_expression_terms(expression, terms);
        }
        GraphPattern::OrderBy { inner, expression } => {
            collect_pattern_terms(inner, terms);
            for order in expression {
                let (OrderExpression::Asc(e) | OrderExpression::Desc(e)) = order;
                collect_expression_terms(e, terms);
            }
        }
        GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Group { inner, .. }
        | GraphPattern::Service { inner, .. } => collect_pattern_terms(inner, terms),
        GraphPattern::Values { .. } => {}
    }
}

fn collect_triple_terms(triple: &TriplePattern, terms: &mut BTreeSet<TermKey>) {
    collect_term_pattern(&triple.subject, terms);
    if let NamedNodePattern::NamedNode(predicate) = &triple.predicate {
        terms.insert(TermKey::from(predicate));
    }
    collect_term_pattern(&triple.object, terms);
}

fn collect_term_pattern(pattern: &TermPattern, terms: &mut BTreeSet<TermKey>) {
    match pattern {
        TermPattern::NamedNode(node) => {
            terms.insert(TermKey::from(node));
        }
        TermPattern::Literal(literal) => {
            terms.insert(TermKey::from(TermRef::from(literal.as_ref())));
        }
        TermPattern::BlankNode(_) | TermPattern::Variable(_) => {}
    }
}

fn collect_path_terms(path: &PropertyPathExpression, terms: &mut BTreeSet<TermKey>) {
    match path {
        PropertyPathExpression::NamedNode(node) => {
            terms.insert(TermKey::from(node));
        }
        PropertyPathExpression::Reverse(inner)
        | PropertyPathExpression::ZeroOrMore(inner)
        | PropertyPathExpression::OneOrMore(inner)
        | PropertyPathExpression::ZeroOrOne(inner) => collect_path_terms(inner, terms),
        PropertyPathExpression::Sequence(left, right)
        | PropertyPathExpression::Alternative(left, right) => {
            collect_path_terms(left, terms);
            collect_path_terms(right, terms);
        }
        PropertyPathExpression::NegatedPropertySet(nodes) => {
            terms.extend(nodes.iter().map(TermKey::from));
        }
    }
}

fn collect_expression_terms(expression: &Expression, terms: &mut BTreeSet<TermKey>) {
    match expression {
        Expression::NamedNode(node) => {
            terms.insert(TermKey::from(node));
        }
        Expression::Exists(pattern) => collect_pattern_terms(pattern, terms),
        Expression::Literal(_) | Expression::Variable(_) | Expression::Bound(_) => {}
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => {
            collect_expression_terms(a, terms);
            collect_expression_terms(b, terms);
        }
        Expression::UnaryPlus(a) | Expression::UnaryMinus(a) | Expression::Not(a) => {
            collect_expression_terms(a, terms);
        }
        Expression::In(a, list) => {
            collect_expression_terms(a, terms);
            for e in list {
                collect_expression_terms(e, terms);
            }
        }
        Expression::If(a, b, c) => {
            collect_expression_terms(a, terms);
            collect_expression_terms(b, terms);
            collect_expression_terms(c, terms);
        }
        Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
            for e in list {
                collect_expression_terms(e, terms);
            }
        }
    }
}
