//! Contracts between the translation engine and the storage layer.
//!
//! The engine never talks to a database directly. It relies on a [QuadStore] that knows the
//! physical table names of a space, resolves terms in batches, writes quads in batches, manages
//! the graph registry and executes the SQL text the engine produces.

pub mod error;
mod loader;
mod quad_store;
mod rows;

pub use loader::{DocumentLoader, FetchedDocument};
pub use quad_store::QuadStore;
pub use rows::SqlRows;
