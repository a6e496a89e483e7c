use oxrdfio::RdfParseError;
use quadsql_common::error::StorageError;
use quadsql_model::{ModelError, NamedNode, SparqlSyntaxError};
use quadsql_translation::TranslationError;
use std::io;

/// An error raised while evaluating a query or an update.
///
/// Translation errors stay distinguishable from storage errors. The engine never retries.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryEvaluationError {
    /// An error in SPARQL parsing.
    #[error(transparent)]
    Parsing(#[from] SparqlSyntaxError),
    /// The algebra could not be translated into SQL.
    #[error(transparent)]
    Translation(#[from] TranslationError),
    /// An error from the storage.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// An error while parsing a document retrieved by `LOAD`.
    #[error(transparent)]
    GraphParsing(#[from] RdfParseError),
    /// A result row could not be turned into RDF terms.
    #[error("Could not decode a result row: {0}")]
    Decoding(#[from] ModelError),
    /// An error returned during results serialization.
    #[error(transparent)]
    ResultsSerialization(io::Error),
    /// Error when `CREATE` tries to create an already existing graph
    #[error("The graph {0} already exists")]
    GraphAlreadyExists(NamedNode),
    /// Error when `DROP` or `CLEAR` tries to remove a not existing graph
    #[error("The graph {0} does not exist")]
    GraphDoesNotExist(NamedNode),
    /// The media type of a document retrieved by `LOAD` is not supported
    #[error("The content media type {0} is not supported")]
    UnsupportedContentType(String),
    /// `LOAD` was requested but no document loader is configured
    #[error("No document loader is configured for loading {0}")]
    NoDocumentLoader(NamedNode),
    /// The results are not a RDF graph
    #[error("The query results are not a RDF graph")]
    NotAGraph,
    #[error("An internal error that likely indicates towards a bug in QuadSQL: {0}")]
    InternalError(String),
}
