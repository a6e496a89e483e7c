use crate::error::QueryEvaluationError;
use crate::options::{QueryOptions, UpdateOptions};
use crate::resolver::TermResolver;
use crate::results::{QueryResults, QuerySolutionStream, QueryTripleStream};
use crate::update::UpdateExecutor;
use quadsql_common::{DocumentLoader, QuadStore, SqlRows};
use quadsql_model::{Query, SpaceId, TermKind, TermKey, Update, Variable};
use quadsql_translation::{
    collect_query_terms, OutputVariable, QueryForm, QueryTranslator, ResolvedTerms, RowDecoder,
    TranslatedQuery, TranslationError,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Evaluates SPARQL queries and updates against the spaces of a [QuadStore].
///
/// An engine consists of:
/// - the storage collaborator that owns the term and quad tables and executes the SQL,
/// - a [TermResolver] that caches term ids across calls,
/// - an optional [DocumentLoader] used by `LOAD`.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn QuadStore>,
    loader: Option<Arc<dyn DocumentLoader>>,
    resolver: Arc<TermResolver>,
}

impl QueryEngine {
    /// Creates a new [QueryEngine] without a document loader.
    pub fn new(store: Arc<dyn QuadStore>) -> Self {
        Self {
            store,
            loader: None,
            resolver: Arc::new(TermResolver::new()),
        }
    }

    /// Uses `loader` to retrieve the documents of `LOAD` operations.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Provides access to the [QuadStore] of this engine.
    pub fn store(&self) -> &dyn QuadStore {
        self.store.as_ref()
    }

    pub fn resolver(&self) -> &TermResolver {
        self.resolver.as_ref()
    }

    pub(crate) fn loader(&self) -> Option<&dyn DocumentLoader> {
        self.loader.as_deref()
    }

    //
    // Querying
    //

    /// Parses and evaluates a SPARQL query with the default options.
    pub async fn query(
        &self,
        space: &SpaceId,
        query: &str,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let query = Query::parse(query, None)?;
        self.execute_query(space, &query, QueryOptions::default())
            .await
    }

    /// Translates `query` into SQL without executing it.
    ///
    /// For `DESCRIBE`, the statement finds the described resources.
    pub async fn translate_query(
        &self,
        space: &SpaceId,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<TranslatedQuery, QueryEvaluationError> {
        let terms = self
            .resolver
            .resolve(self.store(), space, collect_query_terms(query))
            .await?;
        let tables = self.store.table_config(space);
        let translated =
            QueryTranslator::new(&tables, &terms, &options.translation).translate(query)?;
        for diagnostic in &translated.diagnostics {
            tracing::warn!(space = %space, %diagnostic, "Translation diagnostic");
        }
        Ok(translated)
    }

    /// Evaluates a SPARQL [Query] against `space`.
    pub async fn execute_query(
        &self,
        space: &SpaceId,
        query: &Query,
        options: QueryOptions,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let translated = self.translate_query(space, query, &options).await?;
        let rows = self.store.execute_sql(space, &translated.sql).await?;
        tracing::debug!(space = %space, form = %translated.form, rows = rows.len(), "Evaluated query");
        match translated.form {
            QueryForm::Select => Ok(QueryResults::Solutions(solutions(
                &translated.variables,
                rows,
            )?)),
            QueryForm::Ask => Ok(QueryResults::Boolean(!rows.is_empty())),
            QueryForm::Construct => {
                let solutions = solutions(&translated.variables, rows)?;
                Ok(QueryResults::Graph(QueryTripleStream::new(
                    translated.template,
                    solutions,
                )))
            }
            QueryForm::Describe => self.describe(space, &translated, &rows, &options).await,
        }
    }

    /// Reads the triples of the resources found by the first `DESCRIBE` statement.
    async fn describe(
        &self,
        space: &SpaceId,
        translated: &TranslatedQuery,
        resources: &SqlRows,
        options: &QueryOptions,
    ) -> Result<QueryResults, QueryEvaluationError> {
        let decoder = RowDecoder::new(&translated.variables, &resources.columns)?;
        let mut keys = BTreeSet::new();
        for row in &resources.rows {
            for term in decoder.decode(row)?.into_iter().flatten() {
                let key = TermKey::from(&term);
                if key.kind != TermKind::Literal {
                    keys.insert(key);
                }
            }
        }

        let terms = self.resolver.resolve(self.store(), space, keys.clone()).await?;
        let subjects = keys
            .iter()
            .filter_map(|key| terms.get(key))
            .collect::<Vec<_>>();
        let tables = self.store.table_config(space);
        let triples = QueryTranslator::new(&tables, &ResolvedTerms::default(), &options.translation)
            .translate_describe(&subjects);
        let rows = self.store.execute_sql(space, &triples.sql).await?;
        Ok(QueryResults::Graph(QueryTripleStream::new(
            triples.template,
            solutions(&triples.variables, rows)?,
        )))
    }

    //
    // Updating
    //

    /// Parses and applies a SPARQL update with the default options.
    pub async fn update(&self, space: &SpaceId, update: &str) -> Result<(), QueryEvaluationError> {
        let update = Update::parse(update, None)?;
        self.execute_update(space, &update, UpdateOptions::default())
            .await
    }

    /// Applies the operations of `update` in order. An operation that fails stops the update;
    /// the effects of the previous operations remain.
    pub async fn execute_update(
        &self,
        space: &SpaceId,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<(), QueryEvaluationError> {
        let executor = UpdateExecutor::new(self, space, &options);
        for operation in &update.operations {
            executor.apply(operation).await?;
        }
        Ok(())
    }
}

/// Wraps the rows of a solution statement into a stream of solutions.
pub(crate) fn solutions(
    variables: &[OutputVariable],
    rows: SqlRows,
) -> Result<QuerySolutionStream, TranslationError> {
    let decoder = RowDecoder::new(variables, &rows.columns)?;
    let variables = variables
        .iter()
        .map(|v| v.variable.clone())
        .collect::<Arc<[Variable]>>();
    Ok(QuerySolutionStream::new(variables, decoder, rows.rows))
}
