use crate::error::QueryEvaluationError;
use futures::StreamExt;
use oxrdfio::{RdfFormat, RdfSerializer};
use quadsql_model::{TermRef, Variable, VariableRef};
use sparesults::QueryResultsSerializer;
use std::io::Write;

mod query_solution;
mod triples;

pub use query_solution::{QuerySolution, QuerySolutionStream};
pub use sparesults::QueryResultsFormat;
pub use triples::QueryTripleStream;

/// The outcome of a query, shaped by its form.
pub enum QueryResults {
    /// The solutions of a `SELECT` query.
    Solutions(QuerySolutionStream),
    /// The answer of an `ASK` query.
    Boolean(bool),
    /// The triples built by a `CONSTRUCT` or `DESCRIBE` query.
    Graph(QueryTripleStream),
}

impl QueryResults {
    /// Serializes the results in a SPARQL results format.
    ///
    /// Graph results are written as solutions binding `?subject`, `?predicate` and `?object`.
    pub async fn write<W: Write>(
        self,
        writer: W,
        format: QueryResultsFormat,
    ) -> Result<W, QueryEvaluationError> {
        let serializer = QueryResultsSerializer::from_format(format);
        match self {
            Self::Boolean(value) => serializer
                .serialize_boolean_to_writer(writer, value)
                .map_err(QueryEvaluationError::ResultsSerialization),
            Self::Solutions(solutions) => write_solutions(serializer, writer, solutions).await,
            Self::Graph(triples) => write_triples(serializer, writer, triples).await,
        }
    }

    /// Serializes graph results in an RDF format. Fails with
    /// [NotAGraph](QueryEvaluationError::NotAGraph) for solutions and booleans.
    pub async fn write_graph<W: Write>(
        self,
        writer: W,
        format: impl Into<RdfFormat>,
    ) -> Result<W, QueryEvaluationError> {
        let Self::Graph(mut triples) = self else {
            return Err(QueryEvaluationError::NotAGraph);
        };
        let mut serializer = RdfSerializer::from_format(format.into()).for_writer(writer);
        while let Some(triple) = triples.next().await {
            serializer
                .serialize_triple(&triple?)
                .map_err(QueryEvaluationError::ResultsSerialization)?;
        }
        serializer
            .finish()
            .map_err(QueryEvaluationError::ResultsSerialization)
    }
}

async fn write_solutions<W: Write>(
    serializer: QueryResultsSerializer,
    writer: W,
    mut solutions: QuerySolutionStream,
) -> Result<W, QueryEvaluationError> {
    let mut serializer = serializer
        .serialize_solutions_to_writer(writer, solutions.variables().to_vec())
        .map_err(QueryEvaluationError::ResultsSerialization)?;
    while let Some(solution) = solutions.next().await {
        serializer
            .serialize(&solution?)
            .map_err(QueryEvaluationError::ResultsSerialization)?;
    }
    serializer
        .finish()
        .map_err(QueryEvaluationError::ResultsSerialization)
}

async fn write_triples<W: Write>(
    serializer: QueryResultsSerializer,
    writer: W,
    mut triples: QueryTripleStream,
) -> Result<W, QueryEvaluationError> {
    let columns = ["subject", "predicate", "object"].map(VariableRef::new_unchecked);
    let mut serializer = serializer
        .serialize_solutions_to_writer(writer, columns.map(Variable::from).to_vec())
        .map_err(QueryEvaluationError::ResultsSerialization)?;
    while let Some(triple) = triples.next().await {
        let triple = triple?;
        let values: [TermRef<'_>; 3] = [
            triple.subject.as_ref().into(),
            triple.predicate.as_ref().into(),
            triple.object.as_ref(),
        ];
        serializer
            .serialize(columns.into_iter().zip(values))
            .map_err(QueryEvaluationError::ResultsSerialization)?;
    }
    serializer
        .finish()
        .map_err(QueryEvaluationError::ResultsSerialization)
}
