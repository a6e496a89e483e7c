use oxrdf::NamedNodeRef;

/// The graph that holds every quad written without an explicit graph.
///
/// Quads never carry a NULL graph id. The global graph is a regular, queryable graph.
pub const GLOBAL_GRAPH: NamedNodeRef<'static> = NamedNodeRef::new_unchecked("urn:___GLOBAL");

pub mod xsd {
    pub use oxrdf::vocab::xsd::*;
}

pub mod rdf {
    pub use oxrdf::vocab::rdf::*;
}
