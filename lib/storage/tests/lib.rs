use quadsql_model::{GraphName, Literal, NamedNode, Quad, SpaceId};

mod memory;

fn space() -> SpaceId {
    SpaceId::new("test").unwrap()
}

fn example_quad(object: &str) -> Quad {
    Quad::new(
        NamedNode::new("http://example.com/subject").unwrap(),
        NamedNode::new("http://example.com/predicate").unwrap(),
        Literal::new_simple_literal(object),
        GraphName::DefaultGraph,
    )
}

fn example_quad_in_graph(object: &str, graph: &str) -> Quad {
    Quad::new(
        NamedNode::new("http://example.com/subject").unwrap(),
        NamedNode::new("http://example.com/predicate").unwrap(),
        Literal::new_simple_literal(object),
        GraphName::NamedNode(NamedNode::new(graph).unwrap()),
    )
}
