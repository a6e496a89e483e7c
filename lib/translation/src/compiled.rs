use crate::alias::{AliasGenerator, AliasKind};
use crate::binding::{TermColumns, VarBinding, VarMap};
use crate::expression::NULL_NUMBER;
use crate::sql::{column, quote_ident, SelectStatement};
use quadsql_model::schema::TERM_UUID;
use quadsql_model::TableConfig;
use std::collections::BTreeSet;

/// The SQL fragments of a compiled graph pattern.
///
/// A compiled pattern is not a statement yet. Parents combine the fragments of their children
/// and the final assembly turns them into a [SelectStatement].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledPattern {
    /// Items of the `FROM` clause, combined with `CROSS JOIN`.
    pub from: Vec<String>,
    /// Complete join clauses that follow the `FROM` items.
    pub joins: Vec<String>,
    pub where_conditions: Vec<String>,
    /// Conditions that reference aggregate results.
    pub having: Vec<String>,
    pub group_by: Vec<String>,
    pub vars: VarMap,
    /// Whether the fragments aggregate their rows.
    pub grouped: bool,
}

/// Which columns carry a variable through a derived table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposedVar {
    pub key: String,
    pub prefix: String,
    pub has_id: bool,
    pub has_term: bool,
    pub has_numeric: bool,
    pub nullable: bool,
}

impl ExposedVar {
    /// Returns the `(expression, alias)` pairs of this variable's columns in `pattern`.
    fn columns(&self, binding: Option<&VarBinding>) -> Vec<(String, String)> {
        let mut columns = Vec::new();
        if self.has_id {
            let id = binding
                .and_then(|b| b.id.clone())
                .unwrap_or_else(|| "NULL".to_owned());
            columns.push((id, format!("{}{}", self.prefix, column::ID)));
        }
        if self.has_term {
            let term = binding
                .and_then(|b| b.term.clone())
                .unwrap_or_else(TermColumns::null);
            columns.push((term.text, self.prefix.clone()));
            columns.push((term.kind, format!("{}{}", self.prefix, column::KIND)));
            columns.push((term.lang, format!("{}{}", self.prefix, column::LANG)));
            columns.push((term.datatype, format!("{}{}", self.prefix, column::DATATYPE)));
        }
        if self.has_numeric {
            let numeric = binding
                .and_then(|b| b.numeric.clone())
                .unwrap_or_else(|| NULL_NUMBER.to_owned());
            columns.push((numeric, format!("{}{}", self.prefix, column::NUMERIC)));
        }
        columns
    }

    /// The binding of this variable as seen from outside of the derived table `alias`.
    pub fn derived_binding(&self, alias: &str) -> VarBinding {
        let col =
            |suffix: &str| format!("{alias}.{}", quote_ident(&format!("{}{suffix}", self.prefix)));
        VarBinding {
            id: self.has_id.then(|| col(column::ID)),
            term: self.has_term.then(|| TermColumns {
                text: col(""),
                kind: col(column::KIND),
                lang: col(column::LANG),
                datatype: col(column::DATATYPE),
            }),
            numeric: self.has_numeric.then(|| col(column::NUMERIC)),
            nullable: self.nullable,
            aggregate: false,
        }
    }
}

impl CompiledPattern {
    /// A pattern with a single solution that binds nothing.
    pub fn unit(aliases: &mut AliasGenerator) -> Self {
        let alias = aliases.next(AliasKind::Subquery);
        Self {
            from: vec![format!("(SELECT 1 AS \"unit\") AS {alias}")],
            ..Self::default()
        }
    }

    /// Binds `key` to the term id expression `id`, or equates it with the existing binding.
    pub fn bind_id(&mut self, key: &str, id: String) {
        match self.vars.get(key) {
            Some(existing) => {
                let existing = existing.presence().to_owned();
                self.where_conditions.push(format!("{existing} = {id}"));
            }
            None => {
                self.vars.insert(key.to_owned(), VarBinding::id(id));
            }
        }
    }

    /// Makes the term columns of `key` available by joining the term table if necessary.
    pub fn materialize(&mut self, key: &str, tables: &TableConfig, aliases: &mut AliasGenerator) {
        let Some(binding) = self.vars.get_mut(key) else {
            return;
        };
        if binding.term.is_some() {
            return;
        }
        let Some(id) = &binding.id else {
            binding.term = Some(TermColumns::null());
            return;
        };
        let alias = aliases.next(AliasKind::Term);
        let join = if binding.nullable { "LEFT JOIN" } else { "JOIN" };
        self.joins.push(format!(
            "{join} {} AS {alias} ON {alias}.{TERM_UUID} = {id}",
            tables.term_table
        ));
        binding.term = Some(TermColumns::of_term_table(&alias));
    }

    /// Materializes every variable in `keys`.
    pub fn materialize_all<'k>(
        &mut self,
        keys: impl IntoIterator<Item = &'k String>,
        tables: &TableConfig,
        aliases: &mut AliasGenerator,
    ) {
        for key in keys {
            self.materialize(key, tables, aliases);
        }
    }

    /// Describes how `keys` leave this pattern through a derived table.
    ///
    /// Variables with an id that are not materialized only expose the id. Their term columns can
    /// be joined again outside.
    pub fn exposed_vars(&self, keys: &[String]) -> Vec<ExposedVar> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| {
                let binding = self.vars.get(key);
                ExposedVar {
                    key: key.clone(),
                    prefix: format!("c{i}"),
                    has_id: binding.is_some_and(|b| b.id.is_some()),
                    has_term: binding.map_or(true, |b| b.id.is_none() || b.term.is_some()),
                    has_numeric: binding.is_some_and(|b| b.numeric.is_some()),
                    nullable: binding.map_or(true, |b| b.nullable),
                }
            })
            .collect()
    }

    /// Turns the fragments into a statement that outputs the columns of `exposed`.
    pub fn to_select(&self, exposed: &[ExposedVar]) -> SelectStatement {
        SelectStatement {
            distinct: false,
            columns: exposed
                .iter()
                .flat_map(|e| e.columns(self.vars.get(&e.key)))
                .collect(),
            from: self.from.clone(),
            joins: self.joins.clone(),
            where_conditions: self.where_conditions.clone(),
            group_by: self.group_by.clone(),
            having: self.having.clone(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Wraps the fragments into a derived table exposing `keys`.
    ///
    /// The resulting pattern is neither grouped nor references aggregates, so it can be freely
    /// combined with other patterns.
    pub fn into_derived(
        mut self,
        keys: &[String],
        tables: &TableConfig,
        aliases: &mut AliasGenerator,
    ) -> CompiledPattern {
        let without_id = keys
            .iter()
            .filter(|k| self.vars.get(*k).is_some_and(|b| b.id.is_none()))
            .cloned()
            .collect::<Vec<_>>();
        self.materialize_all(&without_id, tables, aliases);
        let exposed = self.exposed_vars(keys);
        let statement = self.to_select(&exposed);
        let alias = aliases.next(AliasKind::Subquery);
        CompiledPattern {
            from: vec![format!("({statement}) AS {alias}")],
            vars: exposed
                .iter()
                .filter(|e| self.vars.contains_key(&e.key))
                .map(|e| (e.key.clone(), e.derived_binding(&alias)))
                .collect(),
            ..CompiledPattern::default()
        }
    }

    /// Seals a grouped pattern into a derived table so that it can be joined with others.
    pub fn sealed(self, tables: &TableConfig, aliases: &mut AliasGenerator) -> CompiledPattern {
        if self.grouped {
            let keys = self.vars.keys().cloned().collect::<Vec<_>>();
            self.into_derived(&keys, tables, aliases)
        } else {
            self
        }
    }

    /// The variables bound by this pattern.
    pub fn var_keys(&self) -> BTreeSet<String> {
        self.vars.keys().cloned().collect()
    }

    /// Adds a condition, to `HAVING` if `aggregate` is set.
    pub fn add_condition(&mut self, condition: String, aggregate: bool) {
        if aggregate {
            self.having.push(condition);
        } else {
            self.where_conditions.push(condition);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::SpaceId;

    fn tables() -> TableConfig {
        TableConfig::for_space(&SpaceId::new("test").unwrap())
    }

    #[test]
    fn repeated_bindings_become_equalities() {
        let mut pattern = CompiledPattern::default();
        pattern.bind_id("x", "q0.subject_uuid".to_owned());
        pattern.bind_id("x", "q1.object_uuid".to_owned());
        assert_eq!(pattern.vars.len(), 1);
        assert_eq!(
            pattern.where_conditions,
            vec!["q0.subject_uuid = q1.object_uuid"]
        );
    }

    #[test]
    fn nullable_bindings_use_left_joins() {
        let mut aliases = AliasGenerator::new();
        let mut pattern = CompiledPattern::default();
        pattern
            .vars
            .insert("x".to_owned(), VarBinding::id("s0.\"c0__id\"").with_nullable(true));
        pattern.materialize("x", &tables(), &mut aliases);
        assert_eq!(
            pattern.joins,
            vec!["LEFT JOIN test_term AS t0 ON t0.term_uuid = s0.\"c0__id\""]
        );
    }

    #[test]
    fn derived_tables_expose_ids_and_computed_terms() {
        let mut aliases = AliasGenerator::new();
        let mut pattern = CompiledPattern {
            from: vec!["test_rdf_quad AS q0".to_owned()],
            ..CompiledPattern::default()
        };
        pattern.bind_id("s", "q0.subject_uuid".to_owned());
        pattern.vars.insert(
            "n".to_owned(),
            VarBinding::computed(TermColumns::constant(&quadsql_model::TermKey::iri("a"))),
        );
        let derived = pattern.into_derived(&["n".to_owned(), "s".to_owned()], &tables(), &mut aliases);
        insta::assert_snapshot!(derived.from[0], @r#"(SELECT 'a' AS "c0", 'U' AS "c0__kind", CAST(NULL AS TEXT) AS "c0__lang", CAST(NULL AS TEXT) AS "c0__dt", q0.subject_uuid AS "c1__id" FROM test_rdf_quad AS q0) AS s0"#);
        assert_eq!(
            derived.vars.get("s").and_then(|b| b.id.clone()),
            Some("s0.\"c1__id\"".to_owned())
        );
        assert!(derived.vars.get("n").is_some_and(|b| b.nullable));
    }
}
