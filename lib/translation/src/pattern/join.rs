use crate::alias::AliasGenerator;
use crate::binding::{compatible_condition, is_projectable, merged_binding, same_term_condition};
use crate::compiled::CompiledPattern;
use crate::error::{TranslationError, TranslationResult};
use crate::expression::ExpressionCompiler;
use crate::pattern::{PatternCompiler, Projection};
use crate::scope::Scope;
use crate::sql::and_all;
use crate::vars::expression_variables;
use itertools::Itertools;
use quadsql_model::algebra::{Expression, GraphPattern};
use std::collections::BTreeSet;

impl PatternCompiler<'_> {
    pub(crate) fn compile_join(
        &self,
        left: &GraphPattern,
        right: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let left = self.compile(left, scope, &mut aliases.child(), projection)?;
        let right = self.compile(right, scope, &mut aliases.child(), projection)?;
        self.merge_join(left, right, aliases)
    }

    /// Combines two compiled patterns with an inner join on their shared variables.
    pub(crate) fn merge_join(
        &self,
        left: CompiledPattern,
        right: CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        let mut left = left.sealed(self.tables, aliases);
        let mut right = right.sealed(self.tables, aliases);
        self.prepare_shared(&mut left, &mut right, aliases);

        let CompiledPattern {
            from,
            joins,
            where_conditions,
            vars,
            ..
        } = right;
        left.from.extend(from);
        left.joins.extend(joins);
        left.where_conditions.extend(where_conditions);
        for (key, right_binding) in vars {
            let Some(left_binding) = left.vars.get(&key) else {
                left.vars.insert(key, right_binding);
                continue;
            };
            let Some(equal) = same_term_condition(left_binding, &right_binding) else {
                return TranslationError::internal(format!("Cannot compare the bindings of {key}"));
            };
            let condition = compatible_condition(left_binding, &right_binding, equal);
            let merged = merged_binding(left_binding, &right_binding);
            left.where_conditions.push(condition);
            left.vars.insert(key, merged);
        }
        Ok(left)
    }

    /// Materializes the shared variables that cannot be compared by id.
    fn prepare_shared(
        &self,
        left: &mut CompiledPattern,
        right: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) {
        for key in left.var_keys().intersection(&right.var_keys()) {
            if !both_have_ids(left, right, key) {
                left.materialize(key, self.tables, aliases);
                right.materialize(key, self.tables, aliases);
            }
        }
    }

    /// Compiles `OPTIONAL`.
    ///
    /// The optional side becomes a derived table that is attached with `LEFT JOIN`. The optional
    /// filter is part of the `ON` condition.
    pub(crate) fn compile_left_join(
        &self,
        left: &GraphPattern,
        right: &GraphPattern,
        expression: Option<&Expression>,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let mut filter_vars = BTreeSet::new();
        if let Some(expression) = expression {
            expression_variables(expression, &mut filter_vars);
        }
        let inner_projection = projection.with(filter_vars.iter().cloned());

        let mut left = self
            .compile(left, scope, &mut aliases.child(), &inner_projection)?
            .sealed(self.tables, aliases);
        let mut right_aliases = aliases.child();
        let mut right = self.compile(right, scope, &mut right_aliases, &inner_projection)?;

        left.materialize_all(&filter_vars, self.tables, aliases);
        right.materialize_all(&filter_vars, self.tables, &mut right_aliases);
        for key in left.var_keys().intersection(&right.var_keys()) {
            if !both_have_ids(&left, &right, key) {
                left.materialize(key, self.tables, aliases);
                right.materialize(key, self.tables, &mut right_aliases);
            }
        }
        let right_keys = right
            .var_keys()
            .into_iter()
            .filter(|k| !k.starts_with('#'))
            .collect::<Vec<_>>();
        let right = right.into_derived(&right_keys, self.tables, &mut right_aliases);

        let mut on = Vec::new();
        let mut combined = left.clone();
        for (key, right_binding) in &right.vars {
            match left.vars.get(key) {
                Some(left_binding) => {
                    let Some(equal) = same_term_condition(left_binding, right_binding) else {
                        return TranslationError::internal(format!(
                            "Cannot compare the bindings of {key}"
                        ));
                    };
                    on.push(compatible_condition(left_binding, right_binding, equal));
                    combined
                        .vars
                        .insert(key.clone(), merged_binding(left_binding, right_binding));
                }
                None => {
                    combined.vars.insert(key.clone(), right_binding.clone());
                }
            }
        }

        if let Some(expression) = expression {
            let compiler = ExpressionCompiler::new(self, scope);
            let condition = compiler.compile_condition(expression, &mut combined, aliases)?;
            on.push(condition);
        }

        // Materializations triggered by the filter only reference the left side.
        let mut joins = combined.joins;
        let derived = right.from.into_iter().join(" CROSS JOIN ");
        joins.push(format!("LEFT JOIN {derived} ON {}", and_all(&on)));

        let vars = combined
            .vars
            .into_iter()
            .map(|(key, binding)| {
                let optional = !left.vars.contains_key(&key);
                let nullable = binding.nullable || optional;
                (key, binding.with_nullable(nullable))
            })
            .collect();
        Ok(CompiledPattern {
            joins,
            vars,
            ..combined
        })
    }

    /// Compiles `MINUS` as a `NOT EXISTS` subquery over the shared variables.
    pub(crate) fn compile_minus(
        &self,
        left: &GraphPattern,
        right: &GraphPattern,
        scope: &Scope,
        aliases: &mut AliasGenerator,
        projection: &Projection,
    ) -> TranslationResult<CompiledPattern> {
        let mut left = self
            .compile(left, scope, &mut aliases.child(), projection)?
            .sealed(self.tables, aliases);
        let mut right_aliases = aliases.child();
        let mut right = self
            .compile(right, scope, &mut right_aliases, &Projection::none())?
            .sealed(self.tables, &mut right_aliases);

        let shared = left
            .var_keys()
            .intersection(&right.var_keys())
            .filter(|k| is_projectable(k))
            .cloned()
            .collect::<Vec<_>>();
        if shared.is_empty() {
            return Ok(left);
        }
        for key in &shared {
            if !both_have_ids(&left, &right, key) {
                left.materialize(key, self.tables, aliases);
                right.materialize(key, self.tables, &mut right_aliases);
            }
        }

        // Solutions are only removed if they share at least one bound variable.
        let mut conditions = right.where_conditions.clone();
        let mut overlap = Vec::new();
        let mut always_overlaps = false;
        for key in &shared {
            let (Some(l), Some(r)) = (left.vars.get(key), right.vars.get(key)) else {
                continue;
            };
            let Some(equal) = same_term_condition(l, r) else {
                return TranslationError::internal(format!("Cannot compare the bindings of {key}"));
            };
            conditions.push(compatible_condition(l, r, equal));
            if l.nullable || r.nullable {
                overlap.push(format!(
                    "({} IS NOT NULL AND {} IS NOT NULL)",
                    l.presence(),
                    r.presence()
                ));
            } else {
                always_overlaps = true;
            }
        }
        if !always_overlaps {
            conditions.push(format!("({})", overlap.join(" OR ")));
        }

        let joins = right.joins.iter().map(|join| format!(" {join}")).join("");
        left.where_conditions.push(format!(
            "NOT EXISTS (SELECT 1 FROM {}{joins} WHERE {})",
            right.from.iter().join(" CROSS JOIN "),
            and_all(&conditions)
        ));
        Ok(left)
    }
}

fn both_have_ids(left: &CompiledPattern, right: &CompiledPattern, key: &str) -> bool {
    left.vars.get(key).is_some_and(|b| b.id.is_some())
        && right.vars.get(key).is_some_and(|b| b.id.is_some())
}
