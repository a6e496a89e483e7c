/// An error raised while translating SPARQL algebra into SQL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TranslationError {
    /// The algebra uses a construct that has no SQL translation.
    #[error("A feature has not yet been implemented: {0}")]
    NotImplemented(String),
    /// The algebra is structurally invalid.
    #[error("Malformed algebra: {0}")]
    Malformed(String),
    /// The translation produced inconsistent SQL. This indicates a bug.
    #[error("An internal error that likely indicates towards a bug in the translation: {0}")]
    Internal(String),
}

impl TranslationError {
    pub fn not_implemented<T>(feature: impl Into<String>) -> Result<T, Self> {
        Err(Self::NotImplemented(feature.into()))
    }

    pub fn internal<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(Self::Internal(cause.into()))
    }
}

pub type TranslationResult<T> = Result<T, TranslationError>;
