use crate::error::StorageError;
use async_trait::async_trait;
use quadsql_model::NamedNode;

/// A document retrieved for `LOAD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedDocument {
    /// The media type announced by the source, without parameters.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Retrieves RDF documents referenced by `LOAD <iri>`.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn fetch(&self, iri: &NamedNode) -> Result<FetchedDocument, StorageError>;
}
