use crate::sql::{quote_literal, NULL_TEXT};
use quadsql_model::schema::{TERM_DATATYPE, TERM_LANG, TERM_TEXT, TERM_TYPE};
use quadsql_model::TermKey;
use std::collections::BTreeMap;

/// SQL expressions describing an RDF term column by column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermColumns {
    pub text: String,
    pub kind: String,
    pub lang: String,
    pub datatype: String,
}

impl TermColumns {
    /// The columns of a term-table alias.
    pub fn of_term_table(alias: &str) -> Self {
        Self {
            text: format!("{alias}.{TERM_TEXT}"),
            kind: format!("{alias}.{TERM_TYPE}"),
            lang: format!("{alias}.{TERM_LANG}"),
            datatype: format!("{alias}.{TERM_DATATYPE}"),
        }
    }

    /// The columns of a constant term.
    pub fn constant(key: &TermKey) -> Self {
        Self {
            text: quote_literal(&key.text),
            kind: quote_literal(key.kind.code()),
            lang: key.lang.as_deref().map_or(NULL_TEXT.to_owned(), quote_literal),
            datatype: key
                .datatype
                .as_deref()
                .map_or(NULL_TEXT.to_owned(), quote_literal),
        }
    }

    /// Columns that are all `NULL`.
    pub fn null() -> Self {
        Self {
            text: NULL_TEXT.to_owned(),
            kind: NULL_TEXT.to_owned(),
            lang: NULL_TEXT.to_owned(),
            datatype: NULL_TEXT.to_owned(),
        }
    }

    /// Combines two alternatives, preferring `self` whenever it is bound.
    pub fn prefer(&self, fallback: &TermColumns) -> Self {
        let pick = |left: &str, right: &str| {
            format!(
                "CASE WHEN {} IS NULL THEN {right} ELSE {left} END",
                self.text
            )
        };
        Self {
            text: format!("COALESCE({}, {})", self.text, fallback.text),
            kind: pick(&self.kind, &fallback.kind),
            lang: pick(&self.lang, &fallback.lang),
            datatype: pick(&self.datatype, &fallback.datatype),
        }
    }

    /// A condition that holds iff both column sets describe the same term.
    pub fn same_term_as(&self, other: &TermColumns) -> String {
        format!(
            "({} = {} AND {} = {} AND {} IS NOT DISTINCT FROM {} AND {} IS NOT DISTINCT FROM {})",
            self.text,
            other.text,
            self.kind,
            other.kind,
            self.lang,
            other.lang,
            self.datatype,
            other.datatype
        )
    }
}

/// The SQL expressions that stand for one variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarBinding {
    /// The term id, if the value is a stored term.
    pub id: Option<String>,
    /// The term columns, once a term-table join exists or the value is computed.
    pub term: Option<TermColumns>,
    /// A numeric SQL expression of the value (e.g., the raw result of an aggregate).
    pub numeric: Option<String>,
    /// Whether the variable may be unbound.
    pub nullable: bool,
    /// Whether the expressions reference an aggregate result.
    pub aggregate: bool,
}

impl VarBinding {
    /// A binding to a term id column.
    pub fn id(expr: impl Into<String>) -> Self {
        Self {
            id: Some(expr.into()),
            term: None,
            numeric: None,
            nullable: false,
            aggregate: false,
        }
    }

    /// A binding to computed term columns.
    pub fn computed(term: TermColumns) -> Self {
        Self {
            id: None,
            term: Some(term),
            numeric: None,
            nullable: true,
            aggregate: false,
        }
    }

    /// A binding that is always unbound.
    pub fn unbound() -> Self {
        Self {
            id: None,
            term: Some(TermColumns::null()),
            numeric: None,
            nullable: true,
            aggregate: false,
        }
    }

    #[must_use]
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// An expression that is `NULL` iff the variable is unbound.
    pub fn presence(&self) -> &str {
        match (&self.id, &self.term) {
            (Some(id), _) => id,
            (None, Some(term)) => &term.text,
            (None, None) => "NULL",
        }
    }
}

/// A condition that holds iff `a` and `b` are bound to the same term.
///
/// Ids are compared whenever both sides have one. Returns `None` if neither the ids nor the term
/// columns of both sides are available.
pub fn same_term_condition(a: &VarBinding, b: &VarBinding) -> Option<String> {
    match (&a.id, &b.id, &a.term, &b.term) {
        (Some(a), Some(b), _, _) => Some(format!("{a} = {b}")),
        (_, _, Some(a), Some(b)) => Some(a.same_term_as(b)),
        _ => None,
    }
}

/// Relaxes `condition` so that it also holds if one of the bindings is unbound.
pub fn compatible_condition(a: &VarBinding, b: &VarBinding, condition: String) -> String {
    if a.nullable || b.nullable {
        format!(
            "({} IS NULL OR {} IS NULL OR {condition})",
            a.presence(),
            b.presence()
        )
    } else {
        condition
    }
}

/// The binding of a variable after joining two compatible solutions.
pub fn merged_binding(a: &VarBinding, b: &VarBinding) -> VarBinding {
    if !a.nullable {
        return a.clone();
    }
    if !b.nullable {
        return b.clone();
    }
    let coalesce = |a: &Option<String>, b: &Option<String>| match (a, b) {
        (Some(a), Some(b)) => Some(format!("COALESCE({a}, {b})")),
        _ => None,
    };
    VarBinding {
        id: coalesce(&a.id, &b.id),
        term: match (&a.term, &b.term) {
            (Some(a), Some(b)) => Some(a.prefer(b)),
            _ => None,
        },
        numeric: coalesce(&a.numeric, &b.numeric),
        nullable: true,
        aggregate: a.aggregate || b.aggregate,
    }
}

/// Maps variable names to their bindings. Blank nodes of patterns are keyed as `_:id`.
pub type VarMap = BTreeMap<String, VarBinding>;

/// The key of a blank node acting as a variable.
pub fn blank_node_key(id: &str) -> String {
    format!("_:{id}")
}

/// Whether a variable map key may appear in a projection.
pub fn is_projectable(name: &str) -> bool {
    !name.starts_with("_:") && !name.starts_with('#')
}
