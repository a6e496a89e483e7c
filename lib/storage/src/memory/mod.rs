//! An in-memory implementation of the term/quad schema.
//!
//! The data of a space lives in plain Rust collections. Each SQL statement is executed by a fresh
//! DataFusion session over Arrow snapshots of the two tables.
mod space;
mod store;
mod tables;

pub use store::MemQuadStore;
