//! Column names of the term and quad tables.
//!
//! Generated SQL only ever refers to these names and to generated aliases.

pub const SUBJECT_UUID: &str = "subject_uuid";
pub const PREDICATE_UUID: &str = "predicate_uuid";
pub const OBJECT_UUID: &str = "object_uuid";
pub const CONTEXT_UUID: &str = "context_uuid";

pub const TERM_UUID: &str = "term_uuid";
pub const TERM_TEXT: &str = "term_text";
pub const TERM_TYPE: &str = "term_type";
pub const TERM_LANG: &str = "lang";
pub const TERM_DATATYPE: &str = "datatype";

/// The quad columns in positional order.
pub const QUAD_COLUMNS: [&str; 4] = [SUBJECT_UUID, PREDICATE_UUID, OBJECT_UUID, CONTEXT_UUID];

/// The term columns in positional order.
pub const TERM_COLUMNS: [&str; 5] = [TERM_UUID, TERM_TEXT, TERM_TYPE, TERM_LANG, TERM_DATATYPE];
