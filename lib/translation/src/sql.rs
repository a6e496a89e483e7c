//! Helpers for rendering SQL text.

use crate::error::{TranslationError, TranslationResult};
use itertools::Itertools;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE` pattern.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A `NULL` typed like the columns of the term table.
pub const NULL_TEXT: &str = "CAST(NULL AS TEXT)";

/// An always false condition.
pub const FALSE_CONDITION: &str = "1 = 0";

/// Joins conditions with `AND`. An empty list yields `TRUE`.
pub fn and_all<S: AsRef<str>>(conditions: &[S]) -> String {
    match conditions {
        [] => "TRUE".to_owned(),
        [single] => single.as_ref().to_owned(),
        _ => conditions
            .iter()
            .map(|c| format!("({})", c.as_ref()))
            .join(" AND "),
    }
}

/// Suffixes of the columns that carry one variable binding through a derived table.
pub mod column {
    pub const ID: &str = "__id";
    pub const KIND: &str = "__kind";
    pub const LANG: &str = "__lang";
    pub const DATATYPE: &str = "__dt";
    pub const NUMERIC: &str = "__num";
}

/// A `SELECT` statement assembled from its clauses.
///
/// `from` items are combined with `CROSS JOIN`; `joins` are complete join clauses (e.g.,
/// `LEFT JOIN ... ON ...`) appended after them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<(String, String)>,
    pub from: Vec<String>,
    pub joins: Vec<String>,
    pub where_conditions: Vec<String>,
    pub group_by: Vec<String>,
    pub having: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectStatement {
    /// Returns the column aliases in output order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(_, alias)| alias.as_str())
    }
}

impl Display for SelectStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        if self.columns.is_empty() {
            f.write_str("1 AS \"_unit\"")?;
        } else {
            let columns = self
                .columns
                .iter()
                .map(|(expr, alias)| format!("{expr} AS {}", quote_ident(alias)))
                .join(", ");
            f.write_str(&columns)?;
        }
        if !self.from.is_empty() {
            write!(f, " FROM {}", self.from.iter().join(" CROSS JOIN "))?;
        }
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        if !self.where_conditions.is_empty() {
            write!(f, " WHERE {}", and_all(&self.where_conditions))?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", self.group_by.iter().join(", "))?;
        }
        if !self.having.is_empty() {
            write!(f, " HAVING {}", and_all(&self.having))?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", self.order_by.iter().join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {limit}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {offset}")?;
        }
        Ok(())
    }
}

#[expect(clippy::expect_used, reason = "The patterns are constants")]
fn constant_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("constant pattern is valid")
}

static STRING_LITERAL: LazyLock<Regex> = LazyLock::new(|| constant_regex("'(?:[^']|'')*'"));
static ALIAS_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| constant_regex(r"\b((?:b\d+_)*(?:pp|q|t|s|u|v|r)\d+)\."));
static ALIAS_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    constant_regex(r"\b(?:AS|RECURSIVE) ((?:b\d+_)*(?:pp|q|t|s|u|v|r)\d+)\b")
});

/// Verifies that every generated alias referenced in `sql` is also declared in `sql`.
pub fn check_aliases(sql: &str) -> TranslationResult<()> {
    let stripped = STRING_LITERAL.replace_all(sql, "''");
    let declared = ALIAS_DECLARATION
        .captures_iter(&stripped)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect::<HashSet<_>>();
    let missing = ALIAS_REFERENCE
        .captures_iter(&stripped)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|alias| !declared.contains(alias))
        .unique()
        .collect::<Vec<_>>();
    if missing.is_empty() {
        Ok(())
    } else {
        TranslationError::internal(format!(
            "The generated SQL references undeclared aliases: {}",
            missing.join(", ")
        ))
    }
}
