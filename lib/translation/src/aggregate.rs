//! Compilation of `GROUP BY` and aggregate functions.

use crate::alias::AliasGenerator;
use crate::binding::{TermColumns, VarBinding, VarMap};
use crate::compiled::CompiledPattern;
use crate::error::{TranslationError, TranslationResult};
use crate::expression::{ExpressionCompiler, NumericType, SqlValue, TermValue, SQL_NUMBER};
use crate::pattern::{PatternCompiler, Projection};
use crate::scope::Scope;
use crate::sql::{quote_literal, NULL_TEXT};
use crate::vars::aggregate_variables;
use itertools::Itertools;
use quadsql_model::algebra::{AggregateExpression, AggregateFunction, GraphPattern};
use quadsql_model::Variable;
use std::collections::BTreeSet;

impl PatternCompiler<'_> {
    /// Compiles a group pattern.
    ///
    /// Group keys are materialized so that all of their columns can appear in `GROUP BY`. After
    /// grouping, only the group keys and the aggregate results are in scope.
    pub(crate) fn compile_group(
        &self,
        inner: &GraphPattern,
        variables: &[Variable],
        aggregates: &[(Variable, AggregateExpression)],
        scope: &Scope,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        let keys = variables
            .iter()
            .map(|v| v.as_str().to_owned())
            .collect::<Vec<_>>();
        let mut projected = keys.iter().cloned().collect::<BTreeSet<_>>();
        for (_, aggregate) in aggregates {
            aggregate_variables(aggregate, &mut projected);
        }
        let mut pattern = self
            .compile(inner, scope, aliases, &Projection::Only(projected))?
            .sealed(self.tables, aliases);

        let mut vars = VarMap::new();
        let mut group_by = Vec::new();
        for key in &keys {
            if !pattern.vars.contains_key(key) {
                continue;
            }
            pattern.materialize(key, self.tables, aliases);
            let Some(binding) = pattern.vars.get(key) else {
                continue;
            };
            group_by.extend(binding.id.iter().cloned());
            if let Some(term) = &binding.term {
                group_by.extend([
                    term.text.clone(),
                    term.kind.clone(),
                    term.lang.clone(),
                    term.datatype.clone(),
                ]);
            }
            group_by.extend(binding.numeric.iter().cloned());
            vars.insert(key.clone(), binding.clone());
        }

        for (variable, aggregate) in aggregates {
            let binding = self.compile_aggregate(aggregate, scope, &mut pattern, aliases)?;
            vars.insert(variable.as_str().to_owned(), binding);
        }

        pattern.group_by = group_by.into_iter().unique().collect();
        pattern.vars = vars;
        pattern.grouped = true;
        Ok(pattern)
    }

    /// Compiles one aggregate against the (not yet grouped) rows of `pattern`.
    fn compile_aggregate(
        &self,
        aggregate: &AggregateExpression,
        scope: &Scope,
        pattern: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<VarBinding> {
        let (function, expression, distinct) = match aggregate {
            AggregateExpression::CountSolutions { distinct } => {
                let count = if *distinct {
                    count_distinct_solutions(pattern)
                } else {
                    "COUNT(*)".to_owned()
                };
                return Ok(count_binding(count));
            }
            AggregateExpression::FunctionCall {
                name,
                expr,
                distinct,
            } => (name, expr, *distinct),
        };
        let distinct = if distinct { "DISTINCT " } else { "" };

        let compiler = ExpressionCompiler::new(self, scope);
        let value = compiler.compile_value(expression, pattern, aliases)?;
        if compiler.uses_aggregate() {
            return Err(TranslationError::Malformed(
                "Aggregates cannot be nested".to_owned(),
            ));
        }

        Ok(match function {
            AggregateFunction::Count => match &value {
                SqlValue::Null => count_binding("COUNT(*)".to_owned()),
                SqlValue::Term(TermValue { id: Some(id), .. }) => {
                    count_binding(format!("COUNT({distinct}{id})"))
                }
                _ => count_binding(format!("COUNT({distinct}{})", value.text())),
            },
            AggregateFunction::Sum | AggregateFunction::Avg => {
                let sql_function = if *function == AggregateFunction::Sum {
                    "SUM"
                } else {
                    "AVG"
                };
                let numeric = value.numeric();
                // Empty groups aggregate to zero, a non-numeric input leaves the result unbound.
                let sql = format!(
                    "CASE WHEN COUNT(*) = 0 THEN 0 WHEN COUNT({numeric}) = COUNT(*) THEN {sql_function}({distinct}CAST({numeric} AS {SQL_NUMBER})) END"
                );
                aggregate_binding(
                    SqlValue::Numeric {
                        sql,
                        datatype: NumericType::Decimal,
                    }
                    .into_binding(true),
                )
            }
            AggregateFunction::Min | AggregateFunction::Max | AggregateFunction::Sample => {
                let direction = if *function == AggregateFunction::Max {
                    "DESC"
                } else {
                    "ASC"
                };
                let columns = value.term_columns();
                let numeric = value.numeric();
                let order = format!(
                    "{} IS NULL, {numeric} {direction} NULLS LAST, {} {direction}",
                    columns.text, columns.text
                );
                let picked = |column: &str| format!("(ARRAY_AGG({column} ORDER BY {order}))[1]");
                aggregate_binding(VarBinding {
                    id: None,
                    term: Some(TermColumns {
                        text: picked(&columns.text),
                        kind: picked(&columns.kind),
                        lang: picked(&columns.lang),
                        datatype: picked(&columns.datatype),
                    }),
                    numeric: Some(picked(&numeric)),
                    nullable: true,
                    aggregate: true,
                })
            }
            AggregateFunction::GroupConcat { separator } => {
                let separator = quote_literal(separator.as_deref().unwrap_or(" "));
                aggregate_binding(VarBinding::computed(TermColumns {
                    text: format!("STRING_AGG({distinct}{}, {separator})", value.text()),
                    kind: "'L'".to_owned(),
                    lang: NULL_TEXT.to_owned(),
                    datatype: NULL_TEXT.to_owned(),
                }))
            }
            AggregateFunction::Custom(name) => {
                return TranslationError::not_implemented(format!("aggregate {name}"))
            }
        })
    }
}

fn aggregate_binding(binding: VarBinding) -> VarBinding {
    VarBinding {
        aggregate: true,
        ..binding
    }
}

/// The binding of a `COUNT` result, an `xsd:integer` that is never unbound.
fn count_binding(count: String) -> VarBinding {
    let value = SqlValue::Numeric {
        sql: count,
        datatype: NumericType::Integer,
    };
    VarBinding {
        nullable: false,
        ..value.into_binding(true)
    }
}

/// `COUNT(DISTINCT *)` over the in-scope variables of `pattern`.
fn count_distinct_solutions(pattern: &CompiledPattern) -> String {
    let parts = pattern
        .vars
        .values()
        .map(|binding| match (&binding.id, &binding.term) {
            (Some(id), _) => format!("COALESCE(CAST({id} AS TEXT), '')"),
            (None, Some(term)) => format!(
                "COALESCE({}, '') || '|' || COALESCE({}, '') || '|' || COALESCE({}, '') || '|' || COALESCE({}, '')",
                term.text, term.kind, term.lang, term.datatype
            ),
            (None, None) => "''".to_owned(),
        })
        .collect::<Vec<_>>();
    if parts.is_empty() {
        // Without variables all solutions are equal.
        return "LEAST(COUNT(*), 1)".to_owned();
    }
    format!("COUNT(DISTINCT CONCAT_WS('/', {}))", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_integers() {
        let binding = count_binding("COUNT(*)".to_owned());
        let term = binding.term.unwrap();
        assert_eq!(term.text, "CAST(CAST(COUNT(*) AS BIGINT) AS TEXT)");
        assert_eq!(term.datatype, "'http://www.w3.org/2001/XMLSchema#integer'");
        assert_eq!(binding.numeric.as_deref(), Some("COUNT(*)"));
        assert!(binding.aggregate);
        assert!(!binding.nullable);
    }

    #[test]
    fn extrema_pick_one_whole_row() -> Result<(), Box<dyn std::error::Error>> {
        let tables = quadsql_model::TableConfig::for_space(&quadsql_model::SpaceId::new("test")?);
        let terms = crate::ResolvedTerms::default();
        let options = crate::TranslationOptions::default();
        let compiler = PatternCompiler::new(&tables, &terms, &options);
        let mut pattern = CompiledPattern::default();
        pattern.vars.insert(
            "x".to_owned(),
            VarBinding::computed(TermColumns::of_term_table("t0")),
        );
        let max = AggregateExpression::FunctionCall {
            name: AggregateFunction::Max,
            expr: quadsql_model::algebra::Expression::Variable(Variable::new_unchecked("x")),
            distinct: false,
        };
        let binding = compiler.compile_aggregate(
            &max,
            &Scope::default(),
            &mut pattern,
            &mut AliasGenerator::new(),
        )?;
        let term = binding.term.ok_or("no term columns")?;
        assert!(term.text.starts_with("(ARRAY_AGG(t0.term_text ORDER BY t0.term_text IS NULL, "));
        assert!(term.lang.starts_with("(ARRAY_AGG(t0.lang ORDER BY t0.term_text IS NULL, "));
        // Every column is sorted by the same key.
        let key = |sql: &str| sql.split_once(" ORDER BY ").map(|(_, key)| key.to_owned());
        assert_eq!(key(&term.text), key(&term.lang));
        assert!(term.text.ends_with(" DESC NULLS LAST, t0.term_text DESC))[1]"));
        Ok(())
    }

    #[test]
    fn distinct_solutions_combine_all_variables() {
        let mut pattern = CompiledPattern::default();
        pattern.bind_id("s", "q0.subject_uuid".to_owned());
        pattern.bind_id("o", "q0.object_uuid".to_owned());
        assert_eq!(
            count_distinct_solutions(&pattern),
            "COUNT(DISTINCT CONCAT_WS('/', COALESCE(CAST(q0.object_uuid AS TEXT), ''), COALESCE(CAST(q0.subject_uuid AS TEXT), '')))"
        );
    }
}
