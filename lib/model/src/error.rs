use thiserror::Error;

/// An error raised while building model values from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The space identifier cannot be used as part of a table name.
    #[error("Invalid space identifier '{0}': expected [a-z][a-z0-9_]* with at most 48 characters")]
    InvalidSpaceId(String),
    /// The term type code is not one of `U`, `L` or `B`.
    #[error("Unknown term type code '{0}'")]
    UnknownTermKind(String),
    /// The stored row cannot be turned into an RDF term.
    #[error("Invalid stored term: {0}")]
    InvalidTerm(String),
}
