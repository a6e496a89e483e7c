//! Assembly of complete SQL statements.
//!
//! The solution modifiers (`ORDER BY`, projection, `DISTINCT`, `LIMIT`/`OFFSET`) of a query are
//! peeled off the algebra and applied once to the statement of the remaining pattern.

use crate::alias::{AliasGenerator, AliasKind};
use crate::binding::is_projectable;
use crate::compiled::{CompiledPattern, ExposedVar};
use crate::error::{TranslationError, TranslationResult};
use crate::expression::ExpressionCompiler;
use crate::options::{Diagnostic, TranslationOptions};
use crate::pattern::{PatternCompiler, Projection};
use crate::resolved::ResolvedTerms;
use crate::scope::Scope;
use crate::sql::{check_aliases, quote_ident, quote_literal, SelectStatement, FALSE_CONDITION};
use crate::vars::expression_variables;
use quadsql_model::algebra::{GraphPattern, OrderExpression, QueryDataset};
use quadsql_model::algebra_term::{NamedNodePattern, TermPattern, TriplePattern};
use quadsql_model::schema::{OBJECT_UUID, PREDICATE_UUID, SUBJECT_UUID};
use quadsql_model::{Query, TableConfig, TermId, Variable};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// The four SPARQL query forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryForm {
    Select,
    Ask,
    Construct,
    Describe,
}

impl Display for QueryForm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QueryForm::Select => "SELECT",
            QueryForm::Ask => "ASK",
            QueryForm::Construct => "CONSTRUCT",
            QueryForm::Describe => "DESCRIBE",
        })
    }
}

/// A variable of the result and the prefix of its output columns.
///
/// The term of the variable is spread over the columns `<prefix>`, `<prefix>__kind`,
/// `<prefix>__lang` and `<prefix>__dt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputVariable {
    pub variable: Variable,
    pub prefix: String,
}

/// The result of translating a query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslatedQuery {
    pub sql: String,
    pub form: QueryForm,
    pub variables: Vec<OutputVariable>,
    /// The triples to instantiate per solution (`CONSTRUCT` and the second step of `DESCRIBE`).
    pub template: Vec<TriplePattern>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The solution modifiers wrapped around a pattern.
struct SolutionModifiers<'p> {
    inner: &'p GraphPattern,
    project: Option<&'p [Variable]>,
    distinct: bool,
    order: &'p [OrderExpression],
    start: usize,
    length: Option<usize>,
}

impl<'p> SolutionModifiers<'p> {
    /// Peels `Slice`, `Distinct`/`Reduced`, `Project` and `OrderBy` off `pattern`, in the order in
    /// which the algebra nests them.
    fn peel(pattern: &'p GraphPattern) -> Self {
        let mut modifiers = Self {
            inner: pattern,
            project: None,
            distinct: false,
            order: &[],
            start: 0,
            length: None,
        };
        if let GraphPattern::Slice {
            inner,
            start,
            length,
        } = modifiers.inner
        {
            modifiers.start = *start;
            modifiers.length = *length;
            modifiers.inner = inner.as_ref();
        }
        match modifiers.inner {
            GraphPattern::Distinct { inner } => {
                modifiers.distinct = true;
                modifiers.inner = inner.as_ref();
            }
            GraphPattern::Reduced { inner } => modifiers.inner = inner.as_ref(),
            _ => {}
        }
        if let GraphPattern::Project { inner, variables } = modifiers.inner {
            modifiers.project = Some(variables.as_slice());
            modifiers.inner = inner.as_ref();
        }
        if let GraphPattern::OrderBy { inner, expression } = modifiers.inner {
            modifiers.order = expression.as_slice();
            modifiers.inner = inner.as_ref();
        }
        modifiers
    }
}

impl PatternCompiler<'_> {
    /// Compiles a nested `SELECT` into a derived table.
    pub(crate) fn compile_sub_select(
        &self,
        pattern: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        let modifiers = SolutionModifiers::peel(pattern);
        let (statement, exposed) =
            self.assemble(&modifiers, None, scope, &mut aliases.child(), false)?;
        let alias = aliases.next(AliasKind::Subquery);
        Ok(CompiledPattern {
            from: vec![format!("({statement}) AS {alias}")],
            vars: exposed
                .iter()
                .map(|e| (e.key.clone(), e.derived_binding(&alias)))
                .collect(),
            ..CompiledPattern::default()
        })
    }

    /// Compiles the pattern below `modifiers` and applies the modifiers.
    ///
    /// The statement outputs `keys` (by default the projected variables). With `materialize`,
    /// every key is output as term columns, otherwise keys bound to stored terms only output their
    /// ids.
    fn assemble(
        &self,
        modifiers: &SolutionModifiers<'_>,
        keys: Option<Vec<String>>,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        materialize: bool,
    ) -> TranslationResult<(SelectStatement, Vec<ExposedVar>)> {
        let keys = keys.or_else(|| {
            modifiers
                .project
                .map(|vars| vars.iter().map(|v| v.as_str().to_owned()).collect())
        });
        let projection = match &keys {
            Some(keys) => {
                let mut projected = keys.iter().cloned().collect::<BTreeSet<_>>();
                for order in modifiers.order {
                    let (OrderExpression::Asc(e) | OrderExpression::Desc(e)) = order;
                    expression_variables(e, &mut projected);
                }
                Projection::Only(projected)
            }
            None => Projection::All,
        };

        let mut pattern = self.compile(modifiers.inner, scope, aliases, &projection)?;
        let keys = keys.unwrap_or_else(|| {
            pattern
                .vars
                .keys()
                .filter(|k| is_projectable(k))
                .cloned()
                .collect()
        });

        let compiler = ExpressionCompiler::new(self, scope);
        let mut order_keys = Vec::new();
        for (i, order) in modifiers.order.iter().enumerate() {
            let (expression, descending) = match order {
                OrderExpression::Asc(e) => (e, false),
                OrderExpression::Desc(e) => (e, true),
            };
            let value = compiler.compile_value(expression, &mut pattern, aliases)?;
            order_keys.push(OrderKey {
                sql: value.numeric(),
                alias: format!("__o{i}n"),
                descending,
            });
            order_keys.push(OrderKey {
                sql: value.text(),
                alias: format!("__o{i}"),
                descending,
            });
        }

        let exposed = if materialize {
            pattern.materialize_all(&keys, self.tables, aliases);
            keys.iter()
                .enumerate()
                .map(|(i, key)| ExposedVar {
                    key: key.clone(),
                    prefix: format!("c{i}"),
                    has_id: false,
                    has_term: true,
                    has_numeric: false,
                    nullable: pattern.vars.get(key).map_or(true, |b| b.nullable),
                })
                .collect::<Vec<_>>()
        } else {
            pattern.exposed_vars(&keys)
        };

        let mut statement = pattern.to_select(&exposed);
        if modifiers.distinct && !order_keys.is_empty() && !statement.columns.is_empty() {
            statement = distinct_then_ordered(statement, &order_keys, aliases);
        } else {
            statement
                .columns
                .extend(order_keys.iter().map(|k| (k.sql.clone(), k.alias.clone())));
            statement.distinct = modifiers.distinct;
            statement.order_by = order_keys.iter().map(OrderKey::clause).collect();
        }
        statement.limit = modifiers.length;
        statement.offset = (modifiers.start > 0).then_some(modifiers.start);
        Ok((statement, exposed))
    }
}

/// A column that the solutions are sorted by.
struct OrderKey {
    sql: String,
    alias: String,
    descending: bool,
}

impl OrderKey {
    fn clause(&self) -> String {
        let direction = if self.descending {
            "DESC NULLS LAST"
        } else {
            "ASC NULLS FIRST"
        };
        format!("{} {direction}", quote_ident(&self.alias))
    }
}

/// Removes duplicate solutions of `inner` before sorting them.
///
/// The sort keys are not part of a solution. Per distinct solution, ascending keys take their
/// smallest and descending keys their largest value.
fn distinct_then_ordered(
    mut inner: SelectStatement,
    keys: &[OrderKey],
    aliases: &mut AliasGenerator,
) -> SelectStatement {
    let alias = aliases.next(AliasKind::Subquery);
    let column = |name: &str| format!("{alias}.{}", quote_ident(name));
    let projected = inner
        .column_names()
        .map(|name| (column(name), name.to_owned()))
        .collect::<Vec<_>>();
    let group_by = projected.iter().map(|(sql, _)| sql.clone()).collect();
    let aggregated = keys
        .iter()
        .map(|key| {
            let function = if key.descending { "MAX" } else { "MIN" };
            (format!("{function}({})", column(&key.alias)), key.alias.clone())
        })
        .collect::<Vec<_>>();
    inner
        .columns
        .extend(keys.iter().map(|k| (k.sql.clone(), k.alias.clone())));
    SelectStatement {
        columns: projected.into_iter().chain(aggregated).collect(),
        from: vec![format!("({inner}) AS {alias}")],
        group_by,
        order_by: keys.iter().map(OrderKey::clause).collect(),
        ..SelectStatement::default()
    }
}

/// Translates whole queries against one space.
///
/// The translator is synchronous. All terms the query mentions must already be resolved into the
/// given [ResolvedTerms].
pub struct QueryTranslator<'a> {
    tables: &'a TableConfig,
    terms: &'a ResolvedTerms,
    options: &'a TranslationOptions,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(
        tables: &'a TableConfig,
        terms: &'a ResolvedTerms,
        options: &'a TranslationOptions,
    ) -> Self {
        Self {
            tables,
            terms,
            options,
        }
    }

    /// Translates `query` into a single SQL statement.
    ///
    /// `DESCRIBE` queries are translated into the statement that finds the described resources.
    /// Their triples are read with a second statement (see [Self::translate_describe]).
    pub fn translate(&self, query: &Query) -> TranslationResult<TranslatedQuery> {
        let span = tracing::debug_span!("translate_query");
        let _enter = span.enter();

        let translated = match query {
            Query::Select {
                dataset, pattern, ..
            } => self.translate_solutions(pattern, dataset.as_ref(), None, QueryForm::Select)?,
            Query::Describe {
                dataset, pattern, ..
            } => {
                let mut keys = Vec::new();
                pattern.on_in_scope_variable(|v| keys.push(v.as_str().to_owned()));
                self.translate_solutions(pattern, dataset.as_ref(), Some(keys), QueryForm::Describe)?
            }
            Query::Construct {
                template,
                dataset,
                pattern,
                ..
            } => {
                let keys = template_variables(template);
                TranslatedQuery {
                    template: template.clone(),
                    ..self.translate_solutions(
                        pattern,
                        dataset.as_ref(),
                        Some(keys),
                        QueryForm::Construct,
                    )?
                }
            }
            Query::Ask {
                dataset, pattern, ..
            } => self.translate_ask(pattern, dataset.as_ref())?,
        };
        tracing::debug!(form = %translated.form, sql = %translated.sql, "Translated query");
        Ok(translated)
    }

    /// Translates `pattern` into a statement that outputs the solutions for `keys` (by default
    /// the projected or in-scope variables).
    ///
    /// This is also used for the `WHERE` clause of updates.
    pub fn translate_solutions(
        &self,
        pattern: &GraphPattern,
        dataset: Option<&QueryDataset>,
        keys: Option<Vec<String>>,
        form: QueryForm,
    ) -> TranslationResult<TranslatedQuery> {
        let compiler = PatternCompiler::new(self.tables, self.terms, self.options);
        let scope = Scope::from_dataset(dataset, self.terms);
        let modifiers = SolutionModifiers::peel(pattern);
        let (statement, exposed) =
            compiler.assemble(&modifiers, keys, &scope, &mut AliasGenerator::new(), true)?;
        let sql = statement.to_string();
        check_aliases(&sql)?;

        let variables = exposed
            .into_iter()
            .map(|e| {
                Ok(OutputVariable {
                    variable: Variable::new(&e.key)
                        .map_err(|error| TranslationError::Internal(error.to_string()))?,
                    prefix: e.prefix,
                })
            })
            .collect::<TranslationResult<Vec<_>>>()?;
        Ok(TranslatedQuery {
            sql,
            form,
            variables,
            template: Vec::new(),
            diagnostics: compiler.take_diagnostics(),
        })
    }

    fn translate_ask(
        &self,
        pattern: &GraphPattern,
        dataset: Option<&QueryDataset>,
    ) -> TranslationResult<TranslatedQuery> {
        let compiler = PatternCompiler::new(self.tables, self.terms, self.options);
        let scope = Scope::from_dataset(dataset, self.terms);
        let compiled = compiler.compile(
            pattern,
            &scope,
            &mut AliasGenerator::new(),
            &Projection::none(),
        )?;
        let statement = SelectStatement {
            columns: vec![("1".to_owned(), "ask".to_owned())],
            limit: Some(1),
            ..compiled.to_select(&[])
        };
        let sql = statement.to_string();
        check_aliases(&sql)?;
        Ok(TranslatedQuery {
            sql,
            form: QueryForm::Ask,
            variables: Vec::new(),
            template: Vec::new(),
            diagnostics: compiler.take_diagnostics(),
        })
    }

    /// Returns the statement reading every triple whose subject is one of `subjects`.
    ///
    /// Triples stored in several graphs are returned once.
    pub fn translate_describe(&self, subjects: &[TermId]) -> TranslatedQuery {
        let variables = ["s", "p", "o"]
            .iter()
            .enumerate()
            .map(|(i, name)| OutputVariable {
                variable: Variable::new_unchecked(*name),
                prefix: format!("c{i}"),
            })
            .collect::<Vec<_>>();
        let template = vec![TriplePattern {
            subject: TermPattern::Variable(Variable::new_unchecked("s")),
            predicate: NamedNodePattern::Variable(Variable::new_unchecked("p")),
            object: TermPattern::Variable(Variable::new_unchecked("o")),
        }];

        let mut aliases = AliasGenerator::new();
        let quad = aliases.next(AliasKind::Quad);
        let mut pattern = CompiledPattern {
            from: vec![format!("{} AS {quad}", self.tables.quad_table)],
            ..CompiledPattern::default()
        };
        for (variable, column) in variables.iter().zip([SUBJECT_UUID, PREDICATE_UUID, OBJECT_UUID])
        {
            pattern.bind_id(variable.variable.as_str(), format!("{quad}.{column}"));
            pattern.materialize(variable.variable.as_str(), self.tables, &mut aliases);
        }
        pattern.where_conditions.push(if subjects.is_empty() {
            FALSE_CONDITION.to_owned()
        } else {
            format!(
                "{quad}.{SUBJECT_UUID} IN ({})",
                subjects
                    .iter()
                    .map(|id| quote_literal(&id.to_string()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        });
        let exposed = variables
            .iter()
            .map(|v| ExposedVar {
                key: v.variable.as_str().to_owned(),
                prefix: v.prefix.clone(),
                has_id: false,
                has_term: true,
                has_numeric: false,
                nullable: false,
            })
            .collect::<Vec<_>>();
        let statement = SelectStatement {
            distinct: true,
            ..pattern.to_select(&exposed)
        };
        tracing::debug!(subjects = subjects.len(), "Translated DESCRIBE lookup");
        TranslatedQuery {
            sql: statement.to_string(),
            form: QueryForm::Describe,
            variables,
            template,
            diagnostics: Vec::new(),
        }
    }
}

/// The variables of a template, in order of first appearance.
fn template_variables(template: &[TriplePattern]) -> Vec<String> {
    let mut keys = Vec::new();
    let mut push = |key: &str| {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_owned());
        }
    };
    for triple in template {
        if let TermPattern::Variable(v) = &triple.subject {
            push(v.as_str());
        }
        if let NamedNodePattern::Variable(v) = &triple.predicate {
            push(v.as_str());
        }
        if let TermPattern::Variable(v) = &triple.object {
            push(v.as_str());
        }
    }
    keys
}
