#![doc(test(attr(deny(warnings))))]

//! Reference storage layers for QuadSQL.
//!
//! [MemQuadStore] keeps the term and quad tables of every space in memory and executes the
//! generated SQL with DataFusion. [HttpDocumentLoader] fetches the documents of `LOAD`
//! operations over HTTP.

mod http;
pub mod memory;

pub use http::{HttpDocumentLoader, StaticDocumentLoader};
pub use memory::MemQuadStore;
