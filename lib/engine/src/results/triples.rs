use crate::error::QueryEvaluationError;
use crate::results::QuerySolutionStream;
use futures::{Stream, StreamExt};
use quadsql_model::algebra_term::TriplePattern;
use quadsql_model::Triple;
use quadsql_translation::{Solution, TemplateInstantiator};
use rustc_hash::FxHashSet;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// A stream over the triples that compose a graph solution.
///
/// Every solution instantiates the template with fresh blank nodes. Triples that were already
/// emitted are skipped.
pub struct QueryTripleStream {
    template: Vec<TriplePattern>,
    inner: QuerySolutionStream,

    buffered_results: Vec<Triple>,
    already_emitted_results: FxHashSet<Triple>,
}

impl QueryTripleStream {
    pub fn new(template: Vec<TriplePattern>, inner: QuerySolutionStream) -> Self {
        Self {
            template,
            inner,
            buffered_results: Vec::new(),
            already_emitted_results: FxHashSet::default(),
        }
    }

    /// Collects the remaining triples.
    pub async fn collect_triples(mut self) -> Result<Vec<Triple>, QueryEvaluationError> {
        let mut triples = Vec::new();
        while let Some(triple) = self.next().await {
            triples.push(triple?);
        }
        Ok(triples)
    }

    fn poll_inner(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Triple, QueryEvaluationError>>> {
        loop {
            if let Some(triple) = self.buffered_results.pop() {
                return Poll::Ready(Some(Ok(triple)));
            }

            let solution = match ready!(self.inner.poll_next_unpin(cx)) {
                None => return Poll::Ready(None),
                Some(Ok(solution)) => solution,
                Some(Err(error)) => return Poll::Ready(Some(Err(error))),
            };

            let solution = Solution::new(solution.variables(), solution.values());
            let mut instantiator = TemplateInstantiator::new();
            // Reversed so that popping keeps the template order.
            for template in self.template.iter().rev() {
                if let Some(triple) = instantiator.triple(template, &solution) {
                    if self.already_emitted_results.insert(triple.clone()) {
                        self.buffered_results.push(triple);
                    }
                }
            }
        }
    }
}

impl Stream for QueryTripleStream {
    type Item = Result<Triple, QueryEvaluationError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.poll_inner(cx)
    }
}
