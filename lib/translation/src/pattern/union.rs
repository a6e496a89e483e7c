use crate::alias::{AliasGenerator, AliasKind};
use crate::compiled::{CompiledPattern, ExposedVar};
use crate::error::TranslationResult;
use crate::pattern::{PatternCompiler, Projection};
use crate::scope::Scope;
use itertools::Itertools;
use quadsql_model::algebra::GraphPattern;
use std::collections::BTreeSet;

impl PatternCompiler<'_> {
    /// Compiles a (possibly nested) `UNION` into a `UNION ALL` derived table.
    ///
    /// Every branch exposes the same columns. A variable keeps its id column only if all branches
    /// bind it to a stored term.
    pub(crate) fn compile_union(
        &self,
        pattern: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let mut operands = Vec::new();
        flatten_union(pattern, &mut operands);

        let mut branches = Vec::with_capacity(operands.len());
        for operand in operands {
            let mut branch_aliases = aliases.child();
            let branch = self.compile(operand, scope, &mut branch_aliases, projection)?;
            branches.push((branch, branch_aliases));
        }

        let keys = branches
            .iter()
            .flat_map(|(branch, _)| branch.vars.keys())
            .filter(|k| !k.starts_with('#'))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let layout = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let bindings = branches
                    .iter()
                    .map(|(branch, _)| branch.vars.get(key))
                    .collect::<Vec<_>>();
                let has_id = bindings.iter().all(|b| b.is_some_and(|b| b.id.is_some()));
                ExposedVar {
                    key: key.clone(),
                    prefix: format!("c{i}"),
                    has_id,
                    has_term: !has_id,
                    has_numeric: bindings.iter().any(|b| b.is_some_and(|b| b.numeric.is_some())),
                    nullable: bindings.iter().any(|b| b.map_or(true, |b| b.nullable)),
                }
            })
            .collect::<Vec<_>>();

        let mut statements = Vec::with_capacity(branches.len());
        for (mut branch, mut branch_aliases) in branches {
            for exposed in layout.iter().filter(|e| e.has_term) {
                branch.materialize(&exposed.key, self.tables, &mut branch_aliases);
            }
            statements.push(branch.to_select(&layout).to_string());
        }

        let alias = aliases.next(AliasKind::Union);
        Ok(CompiledPattern {
            from: vec![format!(
                "({}) AS {alias}",
                statements.iter().join(" UNION ALL ")
            )],
            vars: layout
                .iter()
                .map(|e| (e.key.clone(), e.derived_binding(&alias)))
                .collect(),
            ..CompiledPattern::default()
        })
    }
}

fn flatten_union<'p>(pattern: &'p GraphPattern, operands: &mut Vec<&'p GraphPattern>) {
    match pattern {
        GraphPattern::Union { left, right } => {
            flatten_union(left, operands);
            flatten_union(right, operands);
        }
        other => operands.push(other),
    }
}
