use async_trait::async_trait;
use dashmap::DashMap;
use quadsql_common::error::StorageError;
use quadsql_common::{DocumentLoader, FetchedDocument};
use quadsql_model::NamedNode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

const ACCEPT_RDF: &str = "text/turtle, application/n-triples, application/n-quads, application/trig, application/rdf+xml;q=0.9, text/n3;q=0.8";

/// Fetches documents over HTTP(S).
#[derive(Clone, Debug, Default)]
pub struct HttpDocumentLoader {
    client: reqwest::Client,
}

impl HttpDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client, e.g. with timeouts or a proxy.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentLoader for HttpDocumentLoader {
    async fn fetch(&self, iri: &NamedNode) -> Result<FetchedDocument, StorageError> {
        let fetch_error = |message: String| StorageError::Fetch {
            iri: iri.as_str().to_owned(),
            message,
        };

        let response = self
            .client
            .get(iri.as_str())
            .header(ACCEPT, ACCEPT_RDF)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!(
                "Response code was not OK. Actual: {}",
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(media_type);
        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        tracing::debug!(iri = %iri, bytes = body.len(), ?content_type, "Fetched document");
        Ok(FetchedDocument {
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Serves documents from memory. Useful for tests and for pre-fetched data.
#[derive(Debug, Default)]
pub struct StaticDocumentLoader {
    documents: DashMap<NamedNode, FetchedDocument>,
}

impl StaticDocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `body` available under `iri`.
    pub fn insert(&self, iri: NamedNode, content_type: Option<&str>, body: impl Into<Vec<u8>>) {
        self.documents.insert(
            iri,
            FetchedDocument {
                content_type: content_type.and_then(media_type),
                body: body.into(),
            },
        );
    }
}

#[async_trait]
impl DocumentLoader for StaticDocumentLoader {
    async fn fetch(&self, iri: &NamedNode) -> Result<FetchedDocument, StorageError> {
        self.documents
            .get(iri)
            .map(|document| document.value().clone())
            .ok_or_else(|| StorageError::Fetch {
                iri: iri.as_str().to_owned(),
                message: "No such document".to_owned(),
            })
    }
}

/// Strips the parameters from a `Content-Type` header value.
fn media_type(value: &str) -> Option<String> {
    let media_type = value.split(';').next()?.trim();
    (!media_type.is_empty()).then(|| media_type.to_ascii_lowercase())
}
