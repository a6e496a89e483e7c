use crate::error::QueryEvaluationError;
use futures::Stream;
use quadsql_model::Variable;
use quadsql_translation::RowDecoder;
pub use sparesults::QuerySolution;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::vec;

/// A stream over [`QuerySolution`]s.
///
/// Rows are decoded into terms lazily, so a malformed row surfaces as an error item.
pub struct QuerySolutionStream {
    /// The variables used in the query solutions.
    variables: Arc<[Variable]>,
    decoder: RowDecoder,
    rows: vec::IntoIter<Vec<Option<String>>>,
}

impl QuerySolutionStream {
    pub fn new(
        variables: Arc<[Variable]>,
        decoder: RowDecoder,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        Self {
            variables,
            decoder,
            rows: rows.into_iter(),
        }
    }

    /// The variables used in the solutions.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        self.variables.as_ref()
    }

    fn next_solution(&mut self) -> Option<Result<QuerySolution, QueryEvaluationError>> {
        let row = self.rows.next()?;
        Some(
            self.decoder
                .decode(&row)
                .map(|values| QuerySolution::from((Arc::clone(&self.variables), values)))
                .map_err(QueryEvaluationError::from),
        )
    }
}

impl Stream for QuerySolutionStream {
    type Item = Result<QuerySolution, QueryEvaluationError>;

    #[inline]
    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.next_solution())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
