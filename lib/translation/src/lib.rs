//! Translation of SPARQL algebra into SQL over a term/quad schema.
//!
//! The translation is purely synchronous. Callers first collect the bound terms of an algebra
//! tree ([collect_query_terms]), resolve them into [ResolvedTerms] with a single storage round
//! trip and then hand everything to a [QueryTranslator]. The produced SQL only refers to the
//! tables of a [TableConfig](quadsql_model::TableConfig) and to generated aliases.

mod aggregate;
mod alias;
mod binding;
mod compiled;
mod decode;
mod error;
mod expression;
mod options;
mod paths;
mod pattern;
mod resolved;
mod scope;
mod select;
pub mod sql;
mod template;
mod vars;

pub use alias::{AliasGenerator, AliasKind};
pub use binding::{TermColumns, VarBinding, VarMap};
pub use compiled::{CompiledPattern, ExposedVar};
pub use decode::{decode_term, RowDecoder};
pub use error::{TranslationError, TranslationResult};
pub use expression::{ExpressionCompiler, SqlValue, TermValue};
pub use options::{Diagnostic, TranslationOptions, UnsupportedPolicy, DEFAULT_MAX_PATH_LENGTH};
pub use pattern::{Endpoint, PatternCompiler, Projection};
pub use resolved::{
    collect_dataset_terms, collect_pattern_terms, collect_query_terms, ResolvedTerms,
};
pub use scope::{ActiveGraph, Scope};
pub use select::{OutputVariable, QueryForm, QueryTranslator, TranslatedQuery};
pub use template::{ground_quad, ground_term, Solution, TemplateInstantiator};
pub use vars::{aggregate_variables, expression_variables, pattern_variables};
