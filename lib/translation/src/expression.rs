//! Compilation of SPARQL expressions into SQL expressions over term columns.

use crate::alias::AliasGenerator;
use crate::binding::{compatible_condition, same_term_condition, TermColumns, VarBinding};
use crate::compiled::CompiledPattern;
use crate::error::{TranslationError, TranslationResult};
use crate::pattern::{PatternCompiler, Projection};
use crate::scope::Scope;
use crate::sql::{and_all, escape_like, quote_literal, NULL_TEXT};
use itertools::Itertools;
use quadsql_model::algebra::{Expression, Function, GraphPattern};
use quadsql_model::vocab::{rdf, xsd};
use quadsql_model::{NamedNode, NamedNodeRef, TermKey, TermRef};
use std::cell::Cell;
use std::sync::LazyLock;

/// The numeric datatypes whose lexical forms can be cast to a number.
const NUMERIC_DATATYPES: [NamedNodeRef<'static>; 16] = [
    xsd::INTEGER,
    xsd::DECIMAL,
    xsd::DOUBLE,
    xsd::FLOAT,
    xsd::INT,
    xsd::LONG,
    xsd::SHORT,
    xsd::BYTE,
    xsd::NON_NEGATIVE_INTEGER,
    xsd::POSITIVE_INTEGER,
    xsd::NEGATIVE_INTEGER,
    xsd::NON_POSITIVE_INTEGER,
    xsd::UNSIGNED_INT,
    xsd::UNSIGNED_LONG,
    xsd::UNSIGNED_SHORT,
    xsd::UNSIGNED_BYTE,
];

static NUMERIC_DATATYPE_LIST: LazyLock<String> = LazyLock::new(|| {
    NUMERIC_DATATYPES
        .iter()
        .map(|dt| quote_literal(dt.as_str()))
        .join(", ")
});

/// The SQL type that numeric values are computed in.
pub const SQL_NUMBER: &str = "DOUBLE PRECISION";

/// A `NULL` of [SQL_NUMBER].
pub const NULL_NUMBER: &str = "CAST(NULL AS DOUBLE PRECISION)";

/// The numeric type of a computed number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum NumericType {
    Integer,
    Decimal,
    Double,
}

impl NumericType {
    pub fn datatype(self) -> NamedNodeRef<'static> {
        match self {
            NumericType::Integer => xsd::INTEGER,
            NumericType::Decimal => xsd::DECIMAL,
            NumericType::Double => xsd::DOUBLE,
        }
    }

    /// The numeric type of a datatype IRI, if it is numeric.
    pub fn of_datatype(datatype: &str) -> Option<Self> {
        let datatype = NUMERIC_DATATYPES
            .iter()
            .find(|dt| dt.as_str() == datatype)?;
        Some(if *datatype == xsd::DECIMAL {
            NumericType::Decimal
        } else if *datatype == xsd::DOUBLE || *datatype == xsd::FLOAT {
            NumericType::Double
        } else {
            NumericType::Integer
        })
    }

    /// The numeric type of a datatype column expression that is a constant.
    fn of_sql_datatype(datatype: &str) -> Option<Self> {
        let iri = datatype.strip_prefix('\'')?.strip_suffix('\'')?;
        Self::of_datatype(iri)
    }

    fn promote(self, other: NumericType) -> NumericType {
        self.max(other)
    }

    /// The lexical form of `sql` for this type.
    fn lexical(self, sql: &str) -> String {
        match self {
            NumericType::Integer => format!("CAST(CAST({sql} AS BIGINT) AS TEXT)"),
            NumericType::Decimal | NumericType::Double => format!("CAST({sql} AS TEXT)"),
        }
    }
}

/// An RDF term given by SQL expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermValue {
    pub id: Option<String>,
    pub columns: TermColumns,
    pub numeric: Option<String>,
}

/// The SQL form of a compiled expression.
///
/// Values stay as specific as possible so that, for example, a comparison of two numbers does not
/// need to round-trip through term columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlValue {
    Term(TermValue),
    /// A native SQL boolean.
    Boolean(String),
    Numeric { sql: String, datatype: NumericType },
    /// A string literal with an optional language tag expression.
    Text { sql: String, lang: Option<String> },
    /// A text expression that denotes an IRI.
    Iri(String),
    /// An unbound value.
    Null,
}

impl SqlValue {
    /// The lexical form (`STR`).
    pub fn text(&self) -> String {
        match self {
            SqlValue::Term(term) => term.columns.text.clone(),
            SqlValue::Boolean(sql) => {
                format!("CASE WHEN {sql} THEN 'true' WHEN NOT ({sql}) THEN 'false' END")
            }
            SqlValue::Numeric { sql, datatype } => datatype.lexical(sql),
            SqlValue::Text { sql, .. } | SqlValue::Iri(sql) => sql.clone(),
            SqlValue::Null => NULL_TEXT.to_owned(),
        }
    }

    /// The numeric value, `NULL` if the value is not numeric.
    pub fn numeric(&self) -> String {
        match self {
            SqlValue::Term(term) => term
                .numeric
                .clone()
                .unwrap_or_else(|| numeric_cast(&term.columns)),
            SqlValue::Numeric { sql, .. } => sql.clone(),
            SqlValue::Boolean(_) | SqlValue::Text { .. } | SqlValue::Iri(_) | SqlValue::Null => {
                NULL_NUMBER.to_owned()
            }
        }
    }

    /// The numeric type, as far as it is known statically.
    fn numeric_type(&self) -> NumericType {
        match self {
            SqlValue::Numeric { datatype, .. } => *datatype,
            SqlValue::Term(term) => {
                NumericType::of_sql_datatype(&term.columns.datatype).unwrap_or(NumericType::Decimal)
            }
            _ => NumericType::Decimal,
        }
    }

    /// Whether the value is known to be numeric without looking at its datatype at runtime.
    fn is_static_numeric(&self) -> bool {
        match self {
            SqlValue::Numeric { .. } => true,
            SqlValue::Term(term) => {
                term.numeric.is_some()
                    && NumericType::of_sql_datatype(&term.columns.datatype).is_some()
            }
            _ => false,
        }
    }

    /// The effective boolean value as a native SQL boolean.
    pub fn ebv(&self) -> String {
        match self {
            SqlValue::Boolean(sql) => sql.clone(),
            SqlValue::Numeric { sql, .. } => format!("({sql}) <> 0"),
            SqlValue::Text { sql, .. } => format!("({sql}) <> ''"),
            SqlValue::Term(term) => term_ebv(&term.columns),
            SqlValue::Iri(_) | SqlValue::Null => "CAST(NULL AS BOOLEAN)".to_owned(),
        }
    }

    /// The language tag, `''` if there is none.
    pub fn lang(&self) -> String {
        match self {
            SqlValue::Term(term) => format!(
                "CASE WHEN {} = 'L' THEN COALESCE({}, '') END",
                term.columns.kind, term.columns.lang
            ),
            SqlValue::Text {
                lang: Some(lang), ..
            } => format!("COALESCE({lang}, '')"),
            SqlValue::Boolean(_) | SqlValue::Numeric { .. } | SqlValue::Text { lang: None, .. } => {
                "''".to_owned()
            }
            SqlValue::Iri(_) | SqlValue::Null => NULL_TEXT.to_owned(),
        }
    }

    /// The datatype IRI as text, `NULL` for IRIs and blank nodes.
    pub fn datatype(&self) -> String {
        match self {
            SqlValue::Term(term) => {
                let c = &term.columns;
                format!(
                    "CASE WHEN {} = 'L' THEN COALESCE({}, CASE WHEN {} IS NULL THEN {} ELSE {} END) END",
                    c.kind,
                    c.datatype,
                    c.lang,
                    quote_literal(xsd::STRING.as_str()),
                    quote_literal(rdf::LANG_STRING.as_str())
                )
            }
            SqlValue::Boolean(_) => quote_literal(xsd::BOOLEAN.as_str()),
            SqlValue::Numeric { datatype, .. } => quote_literal(datatype.datatype().as_str()),
            SqlValue::Text { lang: None, .. } => quote_literal(xsd::STRING.as_str()),
            SqlValue::Text {
                lang: Some(lang), ..
            } => format!(
                "CASE WHEN {lang} IS NULL THEN {} ELSE {} END",
                quote_literal(xsd::STRING.as_str()),
                quote_literal(rdf::LANG_STRING.as_str())
            ),
            SqlValue::Iri(_) | SqlValue::Null => NULL_TEXT.to_owned(),
        }
    }

    /// The value as term columns.
    pub fn term_columns(&self) -> TermColumns {
        let literal = |text: String, datatype: Option<NamedNodeRef<'_>>| TermColumns {
            text,
            kind: "'L'".to_owned(),
            lang: NULL_TEXT.to_owned(),
            datatype: datatype.map_or(NULL_TEXT.to_owned(), |dt| quote_literal(dt.as_str())),
        };
        match self {
            SqlValue::Term(term) => term.columns.clone(),
            SqlValue::Boolean(_) => literal(self.text(), Some(xsd::BOOLEAN)),
            SqlValue::Numeric { datatype, .. } => literal(self.text(), Some(datatype.datatype())),
            SqlValue::Text { sql, lang } => TermColumns {
                lang: lang.clone().unwrap_or_else(|| NULL_TEXT.to_owned()),
                ..literal(sql.clone(), None)
            },
            SqlValue::Iri(sql) => TermColumns {
                text: sql.clone(),
                kind: "'U'".to_owned(),
                lang: NULL_TEXT.to_owned(),
                datatype: NULL_TEXT.to_owned(),
            },
            SqlValue::Null => TermColumns::null(),
        }
    }

    /// Turns the value into the binding of a variable. Computed bindings never carry an id.
    pub fn into_binding(self, aggregate: bool) -> VarBinding {
        let numeric = match &self {
            SqlValue::Term(term) => term.numeric.clone(),
            SqlValue::Numeric { sql, .. } => Some(sql.clone()),
            _ => None,
        };
        VarBinding {
            id: None,
            term: Some(self.term_columns()),
            numeric,
            nullable: true,
            aggregate,
        }
    }
}

/// Makes `sql` unbound whenever one of `args` is. SQL functions like `CONCAT` skip `NULL`
/// arguments instead.
fn unless_null(args: &[&str], sql: String) -> String {
    if args.is_empty() {
        return sql;
    }
    let bound = args.iter().map(|arg| format!("{arg} IS NOT NULL")).join(" AND ");
    format!("CASE WHEN {bound} THEN {sql} END")
}

/// Casts the lexical form of numeric literals to a number.
pub fn numeric_cast(columns: &TermColumns) -> String {
    format!(
        "CASE WHEN {} IN ({}) THEN CAST({} AS {SQL_NUMBER}) END",
        columns.datatype, *NUMERIC_DATATYPE_LIST, columns.text
    )
}

fn term_ebv(columns: &TermColumns) -> String {
    format!(
        "CASE WHEN {kind} = 'L' THEN CASE WHEN {dt} = {boolean} THEN {text} IN ('true', '1') WHEN {dt} IN ({numeric}) THEN CAST({text} AS {SQL_NUMBER}) <> 0 WHEN {dt} IS NULL THEN {text} <> '' END END",
        kind = columns.kind,
        dt = columns.datatype,
        text = columns.text,
        boolean = quote_literal(xsd::BOOLEAN.as_str()),
        numeric = *NUMERIC_DATATYPE_LIST,
    )
}

/// Compiles the expressions of one pattern.
///
/// The compiler remembers whether any compiled expression referenced an aggregate result. Such
/// conditions belong into `HAVING`.
pub struct ExpressionCompiler<'c> {
    patterns: &'c PatternCompiler<'c>,
    scope: &'c Scope,
    aggregate: Cell<bool>,
}

impl<'c> ExpressionCompiler<'c> {
    pub fn new(patterns: &'c PatternCompiler<'c>, scope: &'c Scope) -> Self {
        Self {
            patterns,
            scope,
            aggregate: Cell::new(false),
        }
    }

    /// Whether a compiled expression referenced an aggregate result.
    pub fn uses_aggregate(&self) -> bool {
        self.aggregate.get()
    }

    /// Compiles `expression` into a native SQL boolean (its effective boolean value).
    pub fn compile_condition(
        &self,
        expression: &Expression,
        target: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<String> {
        Ok(self.compile_value(expression, target, aliases)?.ebv())
    }

    /// Compiles `expression` against the variables of `target`.
    ///
    /// Variables that need their term columns are materialized in `target`.
    pub fn compile_value(
        &self,
        expression: &Expression,
        target: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<SqlValue> {
        let mut compile = |e: &Expression| self.compile_value(e, target, aliases);
        Ok(match expression {
            Expression::NamedNode(node) => self.constant(&TermKey::from(node)),
            Expression::Literal(literal) => {
                let key = TermKey::from(TermRef::from(literal.as_ref()));
                let mut value = self.constant(&key);
                if let SqlValue::Term(term) = &mut value {
                    let numeric = NumericType::of_datatype(literal.datatype().as_str())
                        .is_some()
                        && literal.value().parse::<f64>().is_ok();
                    if numeric {
                        term.numeric = Some(format!(
                            "CAST({} AS {SQL_NUMBER})",
                            quote_literal(literal.value())
                        ));
                    }
                }
                value
            }
            Expression::Variable(variable) => self.variable(variable.as_str(), target, aliases),
            Expression::Or(a, b) => {
                let (a, b) = (compile(a)?, compile(b)?);
                SqlValue::Boolean(format!("(({}) OR ({}))", a.ebv(), b.ebv()))
            }
            Expression::And(a, b) => {
                let (a, b) = (compile(a)?, compile(b)?);
                SqlValue::Boolean(format!("(({}) AND ({}))", a.ebv(), b.ebv()))
            }
            Expression::Not(a) => SqlValue::Boolean(format!("(NOT ({}))", compile(a)?.ebv())),
            Expression::Equal(a, b) => {
                let (a, b) = (compile(a)?, compile(b)?);
                SqlValue::Boolean(equality(&a, &b))
            }
            Expression::SameTerm(a, b) => {
                let (a, b) = (compile(a)?, compile(b)?);
                SqlValue::Boolean(same_term(&a, &b))
            }
            Expression::Greater(a, b) => comparison(&compile(a)?, ">", &compile(b)?),
            Expression::GreaterOrEqual(a, b) => comparison(&compile(a)?, ">=", &compile(b)?),
            Expression::Less(a, b) => comparison(&compile(a)?, "<", &compile(b)?),
            Expression::LessOrEqual(a, b) => comparison(&compile(a)?, "<=", &compile(b)?),
            Expression::In(a, list) => {
                let a = compile(a)?;
                let mut alternatives = Vec::with_capacity(list.len());
                for e in list {
                    alternatives.push(equality(&a, &compile(e)?));
                }
                if alternatives.is_empty() {
                    SqlValue::Boolean("FALSE".to_owned())
                } else {
                    SqlValue::Boolean(format!(
                        "({})",
                        alternatives.iter().map(|c| format!("({c})")).join(" OR ")
                    ))
                }
            }
            Expression::Add(a, b) => arithmetic(&compile(a)?, "+", &compile(b)?),
            Expression::Subtract(a, b) => arithmetic(&compile(a)?, "-", &compile(b)?),
            Expression::Multiply(a, b) => arithmetic(&compile(a)?, "*", &compile(b)?),
            Expression::Divide(a, b) => {
                let (a, b) = (compile(a)?, compile(b)?);
                SqlValue::Numeric {
                    sql: format!(
                        "(CAST({} AS {SQL_NUMBER}) / NULLIF(CAST({} AS {SQL_NUMBER}), 0))",
                        a.numeric(),
                        b.numeric()
                    ),
                    datatype: a
                        .numeric_type()
                        .promote(b.numeric_type())
                        .promote(NumericType::Decimal),
                }
            }
            Expression::UnaryPlus(a) => {
                let a = compile(a)?;
                SqlValue::Numeric {
                    sql: a.numeric(),
                    datatype: a.numeric_type(),
                }
            }
            Expression::UnaryMinus(a) => {
                let a = compile(a)?;
                SqlValue::Numeric {
                    sql: format!("(-({}))", a.numeric()),
                    datatype: a.numeric_type(),
                }
            }
            Expression::Bound(variable) => match target.vars.get(variable.as_str()) {
                Some(binding) => {
                    if binding.aggregate {
                        self.aggregate.set(true);
                    }
                    SqlValue::Boolean(format!("({} IS NOT NULL)", binding.presence()))
                }
                None => {
                    self.patterns.diagnose(format!(
                        "BOUND({variable}) is always false, {variable} is not in scope"
                    ));
                    SqlValue::Boolean("FALSE".to_owned())
                }
            },
            Expression::If(condition, then, otherwise) => {
                let condition = compile(condition)?.ebv();
                let (then, otherwise) = (compile(then)?, compile(otherwise)?);
                if_then_else(&condition, &then, &otherwise)
            }
            Expression::Coalesce(list) => {
                let mut values = Vec::with_capacity(list.len());
                for e in list {
                    values.push(compile(e)?);
                }
                coalesce(&values)
            }
            Expression::Exists(pattern) => {
                SqlValue::Boolean(self.compile_exists(pattern, target, aliases)?)
            }
            Expression::FunctionCall(function, args) => {
                let mut values = Vec::with_capacity(args.len());
                for e in args {
                    values.push(compile(e)?);
                }
                self.compile_function_call(function, args, values)?
            }
        })
    }

    fn constant(&self, key: &TermKey) -> SqlValue {
        SqlValue::Term(TermValue {
            id: self.patterns.constant_id(key),
            columns: TermColumns::constant(key),
            numeric: None,
        })
    }

    fn variable(
        &self,
        key: &str,
        target: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> SqlValue {
        if !target.vars.contains_key(key) {
            self.patterns
                .diagnose(format!("?{key} is not in scope and evaluates to unbound"));
            return SqlValue::Null;
        }
        target.materialize(key, self.patterns.tables, aliases);
        let Some(binding) = target.vars.get(key) else {
            return SqlValue::Null;
        };
        if binding.aggregate {
            self.aggregate.set(true);
        }
        SqlValue::Term(TermValue {
            id: binding.id.clone(),
            columns: binding.term.clone().unwrap_or_else(TermColumns::null),
            numeric: binding.numeric.clone(),
        })
    }

    /// Compiles `EXISTS { pattern }` into a correlated subquery.
    fn compile_exists(
        &self,
        pattern: &GraphPattern,
        target: &mut CompiledPattern,
        aliases: &mut AliasGenerator,
    ) -> TranslationResult<String> {
        let tables = self.patterns.tables;
        let mut inner_aliases = aliases.child();
        let mut inner = self
            .patterns
            .compile(pattern, self.scope, &mut inner_aliases, &Projection::none())?
            .sealed(tables, &mut inner_aliases);

        let mut conditions = inner.where_conditions.clone();
        for key in inner.var_keys() {
            if !target.vars.contains_key(&key) {
                continue;
            }
            let by_id = target.vars.get(&key).is_some_and(|b| b.id.is_some())
                && inner.vars.get(&key).is_some_and(|b| b.id.is_some());
            if !by_id {
                target.materialize(&key, tables, aliases);
                inner.materialize(&key, tables, &mut inner_aliases);
            }
            let (Some(outer), Some(inner_binding)) = (target.vars.get(&key), inner.vars.get(&key))
            else {
                continue;
            };
            if outer.aggregate {
                self.aggregate.set(true);
            }
            let Some(equal) = same_term_condition(outer, inner_binding) else {
                return TranslationError::internal(format!("Cannot correlate {key}"));
            };
            conditions.push(compatible_condition(outer, inner_binding, equal));
        }

        let joins = inner.joins.iter().map(|join| format!(" {join}")).join("");
        let filter = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", and_all(&conditions))
        };
        Ok(format!(
            "EXISTS (SELECT 1 FROM {}{joins}{filter})",
            inner.from.iter().join(" CROSS JOIN ")
        ))
    }

    /// Compiles a call of a built-in or cast function.
    fn compile_function_call(
        &self,
        function: &Function,
        args: &[Expression],
        values: Vec<SqlValue>,
    ) -> TranslationResult<SqlValue> {
        let kind_test = |values: Vec<SqlValue>, code: &str| -> TranslationResult<SqlValue> {
            let arg = unary(function, values)?;
            Ok(SqlValue::Boolean(format!(
                "({}) = '{code}'",
                arg.term_columns().kind
            )))
        };
        Ok(match function {
            Function::IsIri => kind_test(values, "U")?,
            Function::IsBlank => kind_test(values, "B")?,
            Function::IsLiteral => kind_test(values, "L")?,
            Function::IsNumeric => {
                let arg = unary(function, values)?;
                if arg.is_static_numeric() {
                    SqlValue::Boolean("TRUE".to_owned())
                } else {
                    let columns = arg.term_columns();
                    SqlValue::Boolean(format!(
                        "({} = 'L' AND {} IN ({}))",
                        columns.kind, columns.datatype, *NUMERIC_DATATYPE_LIST
                    ))
                }
            }
            Function::Str => SqlValue::Text {
                sql: unary(function, values)?.text(),
                lang: None,
            },
            Function::Lang => SqlValue::Text {
                sql: unary(function, values)?.lang(),
                lang: None,
            },
            Function::Datatype => SqlValue::Iri(unary(function, values)?.datatype()),
            Function::Iri => match unary(function, values)? {
                SqlValue::Term(term) => SqlValue::Term(TermValue {
                    columns: TermColumns {
                        kind: "'U'".to_owned(),
                        lang: NULL_TEXT.to_owned(),
                        datatype: NULL_TEXT.to_owned(),
                        ..term.columns
                    },
                    id: None,
                    numeric: None,
                }),
                other => SqlValue::Iri(other.text()),
            },
            Function::BNode => {
                let text = match values.into_iter().next() {
                    Some(arg) => format!("MD5({})", arg.text()),
                    None => "MD5(CAST(RANDOM() AS TEXT))".to_owned(),
                };
                SqlValue::Term(TermValue {
                    id: None,
                    columns: TermColumns {
                        text,
                        kind: "'B'".to_owned(),
                        lang: NULL_TEXT.to_owned(),
                        datatype: NULL_TEXT.to_owned(),
                    },
                    numeric: None,
                })
            }
            Function::StrDt => {
                let (value, datatype) = binary(function, values)?;
                let numeric = match &args.get(1) {
                    Some(Expression::NamedNode(dt)) => {
                        NumericType::of_datatype(dt.as_str()).map(|_| {
                            format!("CAST({} AS {SQL_NUMBER})", value.text())
                        })
                    }
                    _ => None,
                };
                SqlValue::Term(TermValue {
                    id: None,
                    columns: TermColumns {
                        text: value.text(),
                        kind: "'L'".to_owned(),
                        lang: NULL_TEXT.to_owned(),
                        datatype: datatype.text(),
                    },
                    numeric,
                })
            }
            Function::StrLang => {
                let (value, lang) = binary(function, values)?;
                SqlValue::Text {
                    sql: value.text(),
                    lang: Some(format!("LOWER({})", lang.text())),
                }
            }
            Function::StrLen => SqlValue::Numeric {
                sql: format!("CHAR_LENGTH({})", unary(function, values)?.text()),
                datatype: NumericType::Integer,
            },
            Function::SubStr => {
                let mut values = values.into_iter();
                let (Some(value), Some(start)) = (values.next(), values.next()) else {
                    return arity_error(function);
                };
                let length = values
                    .next()
                    .map(|l| format!(", CAST({} AS INTEGER)", l.numeric()))
                    .unwrap_or_default();
                SqlValue::Text {
                    sql: format!(
                        "SUBSTR({}, CAST({} AS INTEGER){length})",
                        value.text(),
                        start.numeric()
                    ),
                    lang: text_lang(&value),
                }
            }
            Function::UCase | Function::LCase => {
                let value = unary(function, values)?;
                let sql_function = if *function == Function::UCase {
                    "UPPER"
                } else {
                    "LOWER"
                };
                SqlValue::Text {
                    sql: format!("{sql_function}({})", value.text()),
                    lang: text_lang(&value),
                }
            }
            Function::StrStarts | Function::StrEnds | Function::Contains => {
                let (value, needle) = binary(function, values)?;
                SqlValue::Boolean(string_test(function, &value, &needle, args.get(1)))
            }
            Function::StrBefore => {
                let (value, needle) = binary(function, values)?;
                let (v, n) = (value.text(), needle.text());
                SqlValue::Text {
                    sql: unless_null(
                        &[v.as_str(), n.as_str()],
                        format!(
                            "CASE WHEN STRPOS({v}, {n}) > 0 THEN SUBSTR({v}, 1, STRPOS({v}, {n}) - 1) ELSE '' END"
                        ),
                    ),
                    lang: text_lang(&value),
                }
            }
            Function::StrAfter => {
                let (value, needle) = binary(function, values)?;
                let (v, n) = (value.text(), needle.text());
                SqlValue::Text {
                    sql: unless_null(
                        &[v.as_str(), n.as_str()],
                        format!(
                            "CASE WHEN STRPOS({v}, {n}) > 0 THEN SUBSTR({v}, STRPOS({v}, {n}) + CHAR_LENGTH({n})) ELSE '' END"
                        ),
                    ),
                    lang: text_lang(&value),
                }
            }
            Function::Concat => {
                let texts = values.iter().map(SqlValue::text).collect::<Vec<_>>();
                SqlValue::Text {
                    sql: if texts.is_empty() {
                        "''".to_owned()
                    } else {
                        let parts = texts.iter().map(String::as_str).collect::<Vec<_>>();
                        unless_null(&parts, format!("CONCAT({})", texts.iter().join(", ")))
                    },
                    lang: None,
                }
            }
            Function::LangMatches => {
                let (tag, range) = binary(function, values)?;
                let tag = tag.text();
                match args.get(1) {
                    Some(Expression::Literal(l)) if l.value() == "*" => {
                        SqlValue::Boolean(format!("({tag}) <> ''"))
                    }
                    _ => {
                        let range = range.text();
                        SqlValue::Boolean(format!(
                            "(LOWER({tag}) = LOWER({range}) OR LOWER({tag}) LIKE (LOWER({range}) || '-%'))"
                        ))
                    }
                }
            }
            Function::Regex => {
                let mut values = values.into_iter();
                let (Some(value), Some(pattern)) = (values.next(), values.next()) else {
                    return arity_error(function);
                };
                let operator = if case_insensitive(args.get(2))? {
                    "~*"
                } else {
                    "~"
                };
                SqlValue::Boolean(format!("({}) {operator} ({})", value.text(), pattern.text()))
            }
            Function::Replace => {
                let mut values = values.into_iter();
                let (Some(value), Some(pattern), Some(replacement)) =
                    (values.next(), values.next(), values.next())
                else {
                    return arity_error(function);
                };
                let flags = if case_insensitive(args.get(3))? {
                    "'gi'"
                } else {
                    "'g'"
                };
                let replacement = match args.get(2) {
                    Some(Expression::Literal(l)) => quote_literal(&sparql_to_sql_replacement(l.value())),
                    _ => replacement.text(),
                };
                SqlValue::Text {
                    sql: format!(
                        "REGEXP_REPLACE({}, {}, {replacement}, {flags})",
                        value.text(),
                        pattern.text()
                    ),
                    lang: text_lang(&value),
                }
            }
            Function::Abs | Function::Ceil | Function::Floor | Function::Round => {
                let value = unary(function, values)?;
                let sql_function = match function {
                    Function::Abs => "ABS",
                    Function::Ceil => "CEIL",
                    Function::Floor => "FLOOR",
                    _ => "ROUND",
                };
                SqlValue::Numeric {
                    sql: format!("{sql_function}({})", value.numeric()),
                    datatype: value.numeric_type(),
                }
            }
            Function::Rand => SqlValue::Numeric {
                sql: "RANDOM()".to_owned(),
                datatype: NumericType::Double,
            },
            Function::Year | Function::Month | Function::Day | Function::Hours | Function::Minutes => {
                let value = unary(function, values)?;
                let field = match function {
                    Function::Year => "YEAR",
                    Function::Month => "MONTH",
                    Function::Day => "DAY",
                    Function::Hours => "HOUR",
                    _ => "MINUTE",
                };
                SqlValue::Numeric {
                    sql: format!("EXTRACT({field} FROM CAST({} AS TIMESTAMP))", value.text()),
                    datatype: NumericType::Integer,
                }
            }
            Function::Seconds => SqlValue::Numeric {
                sql: format!(
                    "EXTRACT(SECOND FROM CAST({} AS TIMESTAMP))",
                    unary(function, values)?.text()
                ),
                datatype: NumericType::Decimal,
            },
            Function::Md5 => SqlValue::Text {
                sql: format!("MD5({})", unary(function, values)?.text()),
                lang: None,
            },
            Function::Custom(name) => custom_function_call(name, values)?,
            Function::EncodeForUri
            | Function::Timezone
            | Function::Tz
            | Function::Now
            | Function::Uuid
            | Function::StrUuid
            | Function::Sha1
            | Function::Sha256
            | Function::Sha384
            | Function::Sha512 => {
                return TranslationError::not_implemented(format!("function {function}"))
            }
        })
    }
}

/// Compiles the XSD cast functions.
fn custom_function_call(
    function: &NamedNode,
    values: Vec<SqlValue>,
) -> TranslationResult<SqlValue> {
    let name = function.as_ref();
    let cast = |values: Vec<SqlValue>, pattern: &str, datatype: NumericType| {
        let value = unary_named(function, values)?;
        if value.is_static_numeric() {
            return Ok(SqlValue::Numeric {
                sql: value.numeric(),
                datatype,
            });
        }
        let text = value.text();
        Ok(SqlValue::Numeric {
            sql: format!(
                "CASE WHEN TRIM({text}) ~ '{pattern}' THEN CAST(TRIM({text}) AS {SQL_NUMBER}) END"
            ),
            datatype,
        })
    };
    if name == xsd::INTEGER || name == xsd::INT || name == xsd::LONG {
        return cast(values, r"^[+-]?[0-9]+$", NumericType::Integer);
    }
    if name == xsd::DECIMAL {
        return cast(values, r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)$", NumericType::Decimal);
    }
    if name == xsd::DOUBLE || name == xsd::FLOAT {
        return cast(
            values,
            r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?$",
            NumericType::Double,
        );
    }
    if name == xsd::STRING {
        return Ok(SqlValue::Text {
            sql: unary_named(function, values)?.text(),
            lang: None,
        });
    }
    if name == xsd::BOOLEAN {
        let value = unary_named(function, values)?;
        if value.is_static_numeric() {
            return Ok(SqlValue::Boolean(format!("({}) <> 0", value.numeric())));
        }
        let text = value.text();
        return Ok(SqlValue::Boolean(format!(
            "CASE WHEN {text} IN ('true', '1') THEN TRUE WHEN {text} IN ('false', '0') THEN FALSE END"
        )));
    }
    TranslationError::not_implemented(format!("function {function}"))
}

fn arity_error<T>(function: &Function) -> TranslationResult<T> {
    Err(TranslationError::Malformed(format!(
        "Wrong number of arguments for {function}"
    )))
}

fn unary(function: &Function, values: Vec<SqlValue>) -> TranslationResult<SqlValue> {
    match <[SqlValue; 1]>::try_from(values) {
        Ok([value]) => Ok(value),
        Err(_) => arity_error(function),
    }
}

fn unary_named(function: &NamedNode, values: Vec<SqlValue>) -> TranslationResult<SqlValue> {
    match <[SqlValue; 1]>::try_from(values) {
        Ok([value]) => Ok(value),
        Err(_) => Err(TranslationError::Malformed(format!(
            "Wrong number of arguments for {function}"
        ))),
    }
}

fn binary(
    function: &Function,
    values: Vec<SqlValue>,
) -> TranslationResult<(SqlValue, SqlValue)> {
    match <[SqlValue; 2]>::try_from(values) {
        Ok([a, b]) => Ok((a, b)),
        Err(_) => arity_error(function),
    }
}

/// The language tag expression that string functions preserve from their first argument.
fn text_lang(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Term(term) => Some(term.columns.lang.clone()),
        SqlValue::Text { lang, .. } => lang.clone(),
        _ => None,
    }
}

/// Whether a constant flags argument requests case-insensitive matching.
fn case_insensitive(flags: Option<&Expression>) -> TranslationResult<bool> {
    match flags {
        None => Ok(false),
        Some(Expression::Literal(flags)) => {
            if flags.value().chars().all(|c| c == 'i') {
                Ok(!flags.value().is_empty())
            } else {
                TranslationError::not_implemented(format!("regex flags \"{}\"", flags.value()))
            }
        }
        Some(_) => TranslationError::not_implemented("regex flags that are not constant"),
    }
}

/// Rewrites `$1` group references into the `\1` syntax of SQL regular expressions.
fn sparql_to_sql_replacement(replacement: &str) -> String {
    let mut result = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek().is_some_and(char::is_ascii_digit) => result.push('\\'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    result.push(escaped);
                }
            }
            c => result.push(c),
        }
    }
    result
}

/// `STRSTARTS`, `STRENDS` and `CONTAINS`. Constant needles become `LIKE` patterns.
fn string_test(
    function: &Function,
    value: &SqlValue,
    needle: &SqlValue,
    needle_expression: Option<&Expression>,
) -> String {
    let text = value.text();
    if let Some(Expression::Literal(literal)) = needle_expression {
        let escaped = escape_like(literal.value());
        let pattern = match function {
            Function::StrStarts => format!("{escaped}%"),
            Function::StrEnds => format!("%{escaped}"),
            _ => format!("%{escaped}%"),
        };
        return format!("({text}) LIKE {}", quote_literal(&pattern));
    }
    let needle = needle.text();
    match function {
        Function::StrStarts => format!("LEFT({text}, CHAR_LENGTH({needle})) = {needle}"),
        Function::StrEnds => format!("RIGHT({text}, CHAR_LENGTH({needle})) = {needle}"),
        _ => format!("STRPOS({text}, {needle}) > 0"),
    }
}

/// `=` with RDF term equality and numeric value equality.
fn equality(a: &SqlValue, b: &SqlValue) -> String {
    if a.is_static_numeric() || b.is_static_numeric() {
        return format!("({}) = ({})", a.numeric(), b.numeric());
    }
    match (a, b) {
        (SqlValue::Null, _) | (_, SqlValue::Null) => "CAST(NULL AS BOOLEAN)".to_owned(),
        (SqlValue::Term(_), SqlValue::Term(_)) => format!(
            "COALESCE(({}) = ({}), {})",
            a.numeric(),
            b.numeric(),
            same_term(a, b)
        ),
        (SqlValue::Boolean(_), _) | (_, SqlValue::Boolean(_)) => {
            format!("({}) = ({})", a.ebv(), b.ebv())
        }
        _ => same_term(a, b),
    }
}

/// `sameTerm`. Ids are compared whenever both sides are stored terms.
fn same_term(a: &SqlValue, b: &SqlValue) -> String {
    if let (SqlValue::Term(a), SqlValue::Term(b)) = (a, b) {
        if let (Some(a), Some(b)) = (&a.id, &b.id) {
            return format!("{a} = {b}");
        }
    }
    a.term_columns().same_term_as(&b.term_columns())
}

/// `<`, `<=`, `>` and `>=`. Numbers compare by value, everything else by lexical form.
fn comparison(a: &SqlValue, operator: &str, b: &SqlValue) -> SqlValue {
    let numeric = format!("({}) {operator} ({})", a.numeric(), b.numeric());
    let text = format!("({}) {operator} ({})", a.text(), b.text());
    SqlValue::Boolean(if a.is_static_numeric() || b.is_static_numeric() {
        numeric
    } else if matches!(a, SqlValue::Boolean(_)) || matches!(b, SqlValue::Boolean(_)) {
        format!("({}) {operator} ({})", a.ebv(), b.ebv())
    } else if matches!(a, SqlValue::Term(_)) && matches!(b, SqlValue::Term(_)) {
        format!("COALESCE({numeric}, {text})")
    } else {
        text
    })
}

fn arithmetic(a: &SqlValue, operator: &str, b: &SqlValue) -> SqlValue {
    SqlValue::Numeric {
        sql: format!("(({}) {operator} ({}))", a.numeric(), b.numeric()),
        datatype: a.numeric_type().promote(b.numeric_type()),
    }
}

fn if_then_else(condition: &str, then: &SqlValue, otherwise: &SqlValue) -> SqlValue {
    let pick = |a: &str, b: &str| {
        format!("CASE WHEN {condition} THEN {a} WHEN NOT ({condition}) THEN {b} END")
    };
    if let (SqlValue::Numeric { sql: a, datatype: ta }, SqlValue::Numeric { sql: b, datatype: tb }) =
        (then, otherwise)
    {
        return SqlValue::Numeric {
            sql: pick(a, b),
            datatype: ta.promote(*tb),
        };
    }
    let (a, b) = (then.term_columns(), otherwise.term_columns());
    SqlValue::Term(TermValue {
        id: None,
        columns: TermColumns {
            text: pick(&a.text, &b.text),
            kind: pick(&a.kind, &b.kind),
            lang: pick(&a.lang, &b.lang),
            datatype: pick(&a.datatype, &b.datatype),
        },
        numeric: None,
    })
}

fn coalesce(values: &[SqlValue]) -> SqlValue {
    if values.is_empty() {
        return SqlValue::Null;
    }
    let columns = values.iter().map(SqlValue::term_columns).collect::<Vec<_>>();
    let pick = |column: fn(&TermColumns) -> &String| {
        let branches = columns
            .iter()
            .map(|c| format!("WHEN {} IS NOT NULL THEN {}", c.text, column(c)))
            .join(" ");
        format!("CASE {branches} END")
    };
    SqlValue::Term(TermValue {
        id: None,
        columns: TermColumns {
            text: format!("COALESCE({})", columns.iter().map(|c| &c.text).join(", ")),
            kind: pick(|c| &c.kind),
            lang: pick(|c| &c.lang),
            datatype: pick(|c| &c.datatype),
        },
        numeric: None,
    })
}
