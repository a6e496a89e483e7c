//! Compilation of graph patterns into [CompiledPattern]s.

mod bgp;
mod join;
mod union;
mod values;

use crate::alias::{AliasGenerator, AliasKind};
use crate::binding::{blank_node_key, VarBinding};
use crate::compiled::CompiledPattern;
use crate::error::{TranslationError, TranslationResult};
use crate::expression::ExpressionCompiler;
use crate::options::{Diagnostic, TranslationOptions, UnsupportedPolicy};
use crate::resolved::ResolvedTerms;
use crate::scope::Scope;
use crate::sql::FALSE_CONDITION;
use crate::vars::expression_variables;
use quadsql_model::algebra::{Expression, GraphPattern};
use quadsql_model::algebra_term::{NamedNodePattern, TermPattern};
use quadsql_model::schema::CONTEXT_UUID;
use quadsql_model::{TableConfig, TermKey, TermRef, Variable};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// The variables whose term columns the consumer of a pattern needs.
///
/// Basic graph patterns join the term table for these variables right away. Every other
/// variable only carries its term id until someone needs more.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    All,
    Only(BTreeSet<String>),
}

impl Projection {
    pub fn none() -> Self {
        Projection::Only(BTreeSet::new())
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            Projection::All => true,
            Projection::Only(keys) => keys.contains(key),
        }
    }

    /// Extends the projection with additional variables.
    #[must_use]
    pub fn with(&self, keys: impl IntoIterator<Item = String>) -> Projection {
        match self {
            Projection::All => Projection::All,
            Projection::Only(existing) => {
                let mut existing = existing.clone();
                existing.extend(keys);
                Projection::Only(existing)
            }
        }
    }
}

/// One end of a triple or path pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Constant(TermKey),
    Var(String),
}

impl Endpoint {
    pub fn from_term_pattern(pattern: &TermPattern) -> Self {
        match pattern {
            TermPattern::NamedNode(node) => Endpoint::Constant(TermKey::from(node)),
            TermPattern::Literal(literal) => {
                Endpoint::Constant(TermKey::from(TermRef::from(literal.as_ref())))
            }
            TermPattern::BlankNode(node) => Endpoint::Var(blank_node_key(node.as_str())),
            TermPattern::Variable(v) => Endpoint::Var(v.as_str().to_owned()),
        }
    }

    pub fn from_named_node_pattern(pattern: &NamedNodePattern) -> Self {
        match pattern {
            NamedNodePattern::NamedNode(node) => Endpoint::Constant(TermKey::from(node)),
            NamedNodePattern::Variable(v) => Endpoint::Var(v.as_str().to_owned()),
        }
    }
}

/// Compiles graph patterns against one quad/term table pair.
///
/// A compiler is used for a single translation. It collects the [Diagnostic]s of all patterns it
/// compiles.
pub struct PatternCompiler<'a> {
    pub(crate) tables: &'a TableConfig,
    pub(crate) terms: &'a ResolvedTerms,
    pub(crate) options: &'a TranslationOptions,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl<'a> PatternCompiler<'a> {
    pub fn new(
        tables: &'a TableConfig,
        terms: &'a ResolvedTerms,
        options: &'a TranslationOptions,
    ) -> Self {
        Self {
            tables,
            terms,
            options,
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Records a non-fatal note.
    pub fn diagnose(&self, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(message);
        tracing::debug!(%diagnostic, "Translation diagnostic");
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// The SQL literal of a constant's id, or `None` if the term is not stored.
    pub fn constant_id(&self, key: &TermKey) -> Option<String> {
        self.terms.id_literal(key)
    }

    /// Compiles `pattern` in `scope`.
    pub fn compile(
        &self,
        pattern: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        match pattern {
            GraphPattern::Bgp { patterns } => {
                self.compile_bgp(patterns, scope, aliases, projection)
            }
            GraphPattern::Path {
                subject,
                path,
                object,
            } => self.compile_path(
                &Endpoint::from_term_pattern(subject),
                path,
                &Endpoint::from_term_pattern(object),
                scope,
                aliases,
            ),
            GraphPattern::Join { left, right } => {
                self.compile_join(left, right, scope, aliases, projection)
            }
            GraphPattern::LeftJoin {
                left,
                right,
                expression,
            } => self.compile_left_join(
                left,
                right,
                expression.as_ref(),
                scope,
                aliases,
                projection,
            ),
            GraphPattern::Minus { left, right } => {
                self.compile_minus(left, right, scope, aliases, projection)
            }
            GraphPattern::Union { .. } => self.compile_union(pattern, scope, aliases, projection),
            GraphPattern::Filter { expr, inner } => {
                self.compile_filter(expr, inner, scope, aliases, projection)
            }
            GraphPattern::Graph { name, inner } => {
                self.compile_graph(name, inner, scope, aliases, projection)
            }
            GraphPattern::Extend {
                inner,
                variable,
                expression,
            } => self.compile_extend(inner, variable, expression, scope, aliases, projection),
            GraphPattern::Values {
                variables,
                bindings,
            } => self.compile_values(variables, bindings, aliases),
            // Ordering only matters for the final result.
            GraphPattern::OrderBy { inner, .. } => {
                self.compile(inner, scope, aliases, projection)
            }
            GraphPattern::Project { .. }
            | GraphPattern::Distinct { .. }
            | GraphPattern::Reduced { .. }
            | GraphPattern::Slice { .. } => self.compile_sub_select(pattern, scope, aliases),
            GraphPattern::Group {
                inner,
                variables,
                aggregates,
            } => self.compile_group(inner, variables, aggregates, scope, aliases),
            GraphPattern::Service { name, .. } => {
                self.unsupported(&format!("SERVICE {name}"), aliases)
            }
        }
    }

    /// Handles a construct without SQL translation according to the [UnsupportedPolicy].
    pub(crate) fn unsupported(
        &self,
        feature: &str,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        match self.options.unsupported {
            UnsupportedPolicy::Reject => TranslationError::not_implemented(feature),
            UnsupportedPolicy::EmptyResult => {
                self.diagnose(format!("{feature} is not supported and matches nothing"));
                Ok(self.empty(aliases))
            }
        }
    }

    /// A pattern without solutions.
    pub(crate) fn empty(&self, aliases: &mut AliasGenerator) -> CompiledPattern {
        let mut pattern = CompiledPattern::unit(aliases);
        pattern.where_conditions.push(FALSE_CONDITION.to_owned());
        pattern
    }

    fn compile_filter(
        &self,
        expression: &Expression,
        inner: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let mut referenced = BTreeSet::new();
        expression_variables(expression, &mut referenced);
        let mut pattern = self.compile(inner, scope, aliases, &projection.with(referenced))?;
        let compiler = ExpressionCompiler::new(self, scope);
        let condition = compiler.compile_condition(expression, &mut pattern, aliases)?;
        let having = compiler.uses_aggregate() || pattern.grouped;
        pattern.add_condition(condition, having);
        Ok(pattern)
    }

    fn compile_extend(
        &self,
        inner: &GraphPattern,
        variable: &Variable,
        expression: &Expression,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let mut referenced = BTreeSet::new();
        expression_variables(expression, &mut referenced);
        let mut pattern = self.compile(inner, scope, aliases, &projection.with(referenced))?;
        if pattern.vars.contains_key(variable.as_str()) {
            return Err(TranslationError::Malformed(format!(
                "BIND would rebind the in-scope variable {variable}"
            )));
        }
        let compiler = ExpressionCompiler::new(self, scope);
        let binding = match compiler.compile_value(expression, &mut pattern, aliases) {
            Ok(value) => value.into_binding(compiler.uses_aggregate()),
            Err(TranslationError::NotImplemented(feature)) => {
                self.diagnose(format!(
                    "{variable} is left unbound, its expression is not supported: {feature}"
                ));
                VarBinding::unbound()
            }
            Err(error) => return Err(error),
        };
        pattern.vars.insert(variable.as_str().to_owned(), binding);
        Ok(pattern)
    }

    fn compile_graph(
        &self,
        name: &NamedNodePattern,
        inner: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        match name {
            NamedNodePattern::NamedNode(node) => {
                let scope = scope.with_named_graph(self.constant_id(&TermKey::from(node)));
                self.compile(inner, &scope, aliases, projection)
            }
            NamedNodePattern::Variable(variable) => {
                let scope = scope.with_graph_variable(variable.as_str());
                let mut pattern = self.compile(inner, &scope, aliases, projection)?;
                if !pattern.vars.contains_key(variable.as_str()) {
                    self.bind_graph_list(&mut pattern, variable.as_str(), &scope, aliases);
                }
                if projection.contains(variable.as_str()) {
                    pattern.materialize(variable.as_str(), self.tables, aliases);
                }
                Ok(pattern)
            }
        }
    }

    /// Binds `variable` to every graph of `scope` for patterns that do not read quads.
    fn bind_graph_list(
        &self,
        pattern: &mut CompiledPattern,
        variable: &str,
        scope: &Scope,
        aliases: &mut AliasGenerator,
    ) {
        let quad = aliases.next(AliasKind::Quad);
        let alias = aliases.next(AliasKind::Subquery);
        let conditions = scope.quad_conditions(&quad);
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", crate::sql::and_all(&conditions))
        };
        pattern.from.push(format!(
            "(SELECT DISTINCT {quad}.{CONTEXT_UUID} AS graph_id FROM {} AS {quad}{filter}) AS {alias}",
            self.tables.quad_table
        ));
        pattern.bind_id(variable, format!("{alias}.graph_id"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::{Query, SpaceId};

    fn pattern(query: &str) -> GraphPattern {
        match Query::parse(query, None).unwrap() {
            Query::Select { pattern, .. } => pattern,
            _ => unreachable!(),
        }
    }

    #[test]
    fn unsupported_patterns_follow_the_policy() {
        let tables = TableConfig::for_space(&SpaceId::new("test").unwrap());
        let terms = ResolvedTerms::default();
        let pattern = pattern("SELECT * WHERE { SERVICE <http://example.com/sparql> { ?s ?p ?o } }");
        let pattern = match pattern {
            GraphPattern::Project { inner, .. } => *inner,
            other => other,
        };

        let options = TranslationOptions::default();
        let compiler = PatternCompiler::new(&tables, &terms, &options);
        let compiled = compiler
            .compile(&pattern, &Scope::default(), &mut AliasGenerator::new(), &Projection::All)
            .unwrap();
        assert_eq!(compiled.where_conditions, vec![FALSE_CONDITION]);
        assert_eq!(compiler.take_diagnostics().len(), 1);

        let options = TranslationOptions::default().with_unsupported_policy(UnsupportedPolicy::Reject);
        let compiler = PatternCompiler::new(&tables, &terms, &options);
        let error = compiler
            .compile(&pattern, &Scope::default(), &mut AliasGenerator::new(), &Projection::All)
            .unwrap_err();
        assert!(matches!(error, TranslationError::NotImplemented(_)));
    }

    #[test]
    fn projection_extension() {
        let projection = Projection::none().with(["a".to_owned()]);
        assert!(projection.contains("a"));
        assert!(!projection.contains("b"));
        assert!(Projection::All.with(["a".to_owned()]).contains("b"));
    }
}
