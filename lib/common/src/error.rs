use std::error::Error;
use std::io;

/// An error related to storage operations (reads, writes, SQL execution...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Error from the OS I/O layer.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The SQL engine rejected or failed to execute a statement.
    #[error("Failed to execute SQL: {message}")]
    Execution { message: String, sql: String },
    /// A remote document could not be retrieved.
    #[error("Failed to fetch {iri}: {message}")]
    Fetch { iri: String, message: String },
    #[error("{0}")]
    Other(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl StorageError {
    /// Wraps an arbitrary error.
    pub fn other(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Other(error.into())
    }
}

impl From<StorageError> for io::Error {
    #[inline]
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Io(error) => error,
            other => Self::other(other.to_string()),
        }
    }
}
