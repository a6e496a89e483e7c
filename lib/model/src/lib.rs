//! Data model shared by the QuadSQL crates.
//!
//! RDF terms are stored deduplicated in a *term table* and referenced by id from a *quad table*.
//! This crate contains the types that describe that layout ([TermKey], [TermId], [TableConfig])
//! and re-exports the RDF model types that the other crates build upon.

mod error;
pub mod schema;
mod space;
mod term;
pub mod vocab;

pub use error::*;
pub use space::*;
pub use term::*;

// Re-export some oxrdf types.
pub use oxrdf::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, Literal, LiteralRef, NamedNode,
    NamedNodeRef, NamedOrBlankNode, Quad, QuadRef, Subject, SubjectRef, Term, TermRef, Triple,
    TripleRef, Variable, VariableRef,
};

// Re-export the algebra so that downstream crates share the same version.
pub use spargebra::{
    algebra, term as algebra_term, GraphUpdateOperation, Query, SparqlSyntaxError, Update,
};
