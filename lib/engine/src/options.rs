use quadsql_translation::{TranslationOptions, UnsupportedPolicy};

/// Options for SPARQL query evaluation.
#[derive(Clone, Debug, Default)]
pub struct QueryOptions {
    /// Options that influence the generated SQL.
    pub translation: TranslationOptions,
}

impl QueryOptions {
    /// Fails queries that use constructs without SQL translation instead of replacing them by
    /// an empty relation.
    #[must_use]
    pub fn reject_unsupported(mut self) -> Self {
        self.translation = self
            .translation
            .with_unsupported_policy(UnsupportedPolicy::Reject);
        self
    }
}

/// Options for SPARQL update evaluation.
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    /// The options used for the `WHERE` clauses.
    pub query_options: QueryOptions,
}

impl From<QueryOptions> for UpdateOptions {
    #[inline]
    fn from(query_options: QueryOptions) -> Self {
        Self { query_options }
    }
}
