use crate::alias::{AliasGenerator, AliasKind};
use crate::binding::{TermColumns, VarBinding};
use crate::compiled::{CompiledPattern, ExposedVar};
use crate::error::TranslationResult;
use crate::pattern::PatternCompiler;
use crate::sql::SelectStatement;
use itertools::Itertools;
use quadsql_model::algebra_term::GroundTerm;
use quadsql_model::{TermKey, TermRef, Variable};

impl PatternCompiler<'_> {
    /// Compiles inline `VALUES` rows into a derived table of constant term columns.
    pub(crate) fn compile_values(
        &self,
        variables: &[Variable],
        bindings: &[Vec<Option<GroundTerm>>],
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<CompiledPattern> {
        if bindings.is_empty() {
            return Ok(self.empty(aliases));
        }
        if variables.is_empty() {
            return Ok(CompiledPattern::unit(aliases));
        }

        let layout = variables
            .iter()
            .enumerate()
            .map(|(i, variable)| ExposedVar {
                key: variable.as_str().to_owned(),
                prefix: format!("c{i}"),
                has_id: false,
                has_term: true,
                has_numeric: false,
                nullable: bindings.iter().any(|row| row.get(i).map_or(true, Option::is_none)),
            })
            .collect::<Vec<_>>();

        let rows = bindings.iter().map(|row| {
            let mut values = CompiledPattern::default();
            for (exposed, value) in layout.iter().zip(row) {
                if let Some(value) = value {
                    let key = match value {
                        GroundTerm::NamedNode(node) => TermKey::from(node),
                        GroundTerm::Literal(literal) => {
                            TermKey::from(TermRef::from(literal.as_ref()))
                        }
                    };
                    values.vars.insert(
                        exposed.key.clone(),
                        VarBinding::computed(TermColumns::constant(&key)),
                    );
                }
            }
            SelectStatement {
                columns: values.to_select(&layout).columns,
                ..SelectStatement::default()
            }
            .to_string()
        });

        let alias = aliases.next(AliasKind::Values);
        let vars = layout
            .iter()
            .map(|e| (e.key.clone(), e.derived_binding(&alias)))
            .collect();
        Ok(CompiledPattern {
            from: vec![format!("({}) AS {alias}", rows.into_iter().join(" UNION ALL "))],
            vars,
            ..CompiledPattern::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TranslationOptions;
    use crate::resolved::ResolvedTerms;
    use quadsql_model::{NamedNode, SpaceId, TableConfig};

    #[test]
    fn rows_become_a_union_of_constants() {
        let tables = TableConfig::for_space(&SpaceId::new("test").unwrap());
        let terms = ResolvedTerms::default();
        let options = TranslationOptions::default();
        let compiler = PatternCompiler::new(&tables, &terms, &options);
        let compiled = compiler
            .compile_values(
                &[Variable::new_unchecked("x")],
                &[
                    vec![Some(GroundTerm::NamedNode(NamedNode::new_unchecked(
                        "http://example.com/a",
                    )))],
                    vec![None],
                ],
                &mut AliasGenerator::new(),
            )
            .unwrap();
        insta::assert_snapshot!(compiled.from[0], @r#"(SELECT 'http://example.com/a' AS "c0", 'U' AS "c0__kind", CAST(NULL AS TEXT) AS "c0__lang", CAST(NULL AS TEXT) AS "c0__dt" UNION ALL SELECT CAST(NULL AS TEXT) AS "c0", CAST(NULL AS TEXT) AS "c0__kind", CAST(NULL AS TEXT) AS "c0__lang", CAST(NULL AS TEXT) AS "c0__dt") AS v0"#);
        assert!(compiled.vars["x"].nullable);
    }
}
