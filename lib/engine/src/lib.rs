//! Evaluation of SPARQL queries and updates on top of a [QuadStore](quadsql_common::QuadStore).
//!
//! The [QueryEngine] resolves the terms of a request, lets the translator produce SQL, executes
//! it through the store and decodes the rows into SPARQL results.

mod engine;
pub mod error;
mod options;
mod resolver;
pub mod results;
mod update;

pub use engine::QueryEngine;
pub use error::QueryEvaluationError;
pub use options::{QueryOptions, UpdateOptions};
pub use resolver::TermResolver;
pub use results::{QueryResults, QueryResultsFormat, QuerySolution, QuerySolutionStream};
