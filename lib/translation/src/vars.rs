//! Collects the variables mentioned by expressions and patterns.

use crate::binding::blank_node_key;
use quadsql_model::algebra::{AggregateExpression, Expression, GraphPattern, OrderExpression};
use quadsql_model::algebra_term::{NamedNodePattern, TermPattern, TriplePattern};
use std::collections::BTreeSet;

/// Adds the variables referenced by `expression` (including those of `EXISTS` patterns).
pub fn expression_variables(expression: &Expression, vars: &mut BTreeSet<String>) {
    match expression {
        Expression::Variable(v) | Expression::Bound(v) => {
            vars.insert(v.as_str().to_owned());
        }
        Expression::NamedNode(_) | Expression::Literal(_) => {}
        Expression::Exists(pattern) => pattern_variables(pattern, vars),
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
            expression_variables(a, vars);
            expression_variables(b, vars);
        }
        Expression::UnaryPlus(a) | Expression::UnaryMinus(a) | Expression::Not(a) => {
            expression_variables(a, vars);
        }
        Expression::If(a, b, c) => {
            expression_variables(a, vars);
            expression_variables(b, vars);
            expression_variables(c, vars);
        }
        Expression::In(a, list) => {
            expression_variables(a, vars);
            for e in list {
                expression_variables(e, vars);
            }
        }
        Expression::Coalesce(list) | Expression::FunctionCall(_, list) => {
            for e in list {
                expression_variables(e, vars);
            }
        }
    }
}

/// Adds the input variables of an aggregate.
pub fn aggregate_variables(aggregate: &AggregateExpression, vars: &mut BTreeSet<String>) {
    match aggregate {
        AggregateExpression::CountSolutions { .. } => {}
        AggregateExpression::FunctionCall { expr, .. } => expression_variables(expr, vars),
    }
}

/// Adds every variable mentioned anywhere in `pattern`.
pub fn pattern_variables(pattern: &GraphPattern, vars: &mut BTreeSet<String>) {
    match pattern {
        GraphPattern::Bgp { patterns } => {
            for triple in patterns {
                triple_variables(triple, vars);
            }
        }
        GraphPattern::Path {
            subject, object, ..
        } => {
            term_pattern_variable(subject, vars);
            term_pattern_variable(object, vars);
        }
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right } => {
            pattern_variables(left, vars);
            pattern_variables(right, vars);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            pattern_variables(left, vars);
            pattern_variables(right, vars);
            if let Some(expression) = expression {
                expression_variables(expression, vars);
            }
        }
        GraphPattern::Filter { expr, inner } => {
            expression_variables(expr, vars);
            pattern_variables(inner, vars);
        }
        GraphPattern::Graph { name, inner } => {
            if let NamedNodePattern::Variable(v) = name {
                vars.insert(v.as_str().to_owned());
            }
            pattern_variables(inner, vars);
        }
        GraphPattern::Extend {
            inner,
            variable,
            expression,
        } => {
            pattern_variables(inner, vars);
            vars.insert(variable.as_str().to_owned());
            expression_variables(expression, vars);
        }
        GraphPattern::Values { variables, .. } => {
            vars.extend(variables.iter().map(|v| v.as_str().to_owned()));
        }
        GraphPattern::OrderBy { inner, expression } => {
            pattern_variables(inner, vars);
            for order in expression {
                let (OrderExpression::Asc(e) | OrderExpression::Desc(e)) = order;
                expression_variables(e, vars);
            }
        }
        GraphPattern::Project { variables, .. } => {
            vars.extend(variables.iter().map(|v| v.as_str().to_owned()));
        }
        GraphPattern::Group {
            variables,
            aggregates,
            inner,
        } => {
            vars.extend(variables.iter().map(|v| v.as_str().to_owned()));
            vars.extend(aggregates.iter().map(|(v, _)| v.as_str().to_owned()));
            let mut inner_vars = BTreeSet::new();
            pattern_variables(inner, &mut inner_vars);
            vars.extend(inner_vars.into_iter().filter(|v| !v.starts_with("_:")));
        }
        GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. }
        | GraphPattern::Service { inner, .. } => pattern_variables(inner, vars),
    }
}

fn triple_variables(triple: &TriplePattern, vars: &mut BTreeSet<String>) {
    term_pattern_variable(&triple.subject, vars);
    if let NamedNodePattern::Variable(v) = &triple.predicate {
        vars.insert(v.as_str().to_owned());
    }
    term_pattern_variable(&triple.object, vars);
}

fn term_pattern_variable(pattern: &TermPattern, vars: &mut BTreeSet<String>) {
    match pattern {
        TermPattern::Variable(v) => {
            vars.insert(v.as_str().to_owned());
        }
        TermPattern::BlankNode(b) => {
            vars.insert(blank_node_key(b.as_str()));
        }
        TermPattern::NamedNode(_) | TermPattern::Literal(_) => {}
    }
}
