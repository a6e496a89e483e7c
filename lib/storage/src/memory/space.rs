use quadsql_model::{GraphNameRef, NamedNode, QuadRef, TermId, TermKey, TermRef};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// A stored quad: subject, predicate, object and graph id.
pub(super) type EncodedQuad = [TermId; 4];

/// The contents of one space.
#[derive(Debug, Default)]
pub(super) struct SpaceData {
    ids: FxHashMap<TermKey, TermId>,
    /// The terms in insertion order.
    terms: Vec<(TermId, TermKey)>,
    quads: FxHashSet<EncodedQuad>,
    graphs: BTreeSet<NamedNode>,
}

impl SpaceData {
    pub(super) fn terms(&self) -> &[(TermId, TermKey)] {
        &self.terms
    }

    pub(super) fn quads(&self) -> impl Iterator<Item = &EncodedQuad> {
        self.quads.iter()
    }

    pub(super) fn len(&self) -> usize {
        self.quads.len()
    }

    pub(super) fn lookup(&self, key: &TermKey) -> Option<TermId> {
        self.ids.get(key).copied()
    }

    /// Returns the id of `key`, allocating a new one for unknown terms.
    pub(super) fn intern(&mut self, key: TermKey) -> TermId {
        if let Some(id) = self.ids.get(&key) {
            return *id;
        }
        let id = TermId::new_random();
        self.ids.insert(key.clone(), id);
        self.terms.push((id, key));
        id
    }

    pub(super) fn insert(&mut self, quad: QuadRef<'_>) -> bool {
        let encoded = [
            self.intern(TermKey::from(TermRef::from(quad.subject))),
            self.intern(TermKey::from(quad.predicate)),
            self.intern(TermKey::from(quad.object)),
            self.intern(TermKey::graph(quad.graph_name)),
        ];
        self.quads.insert(encoded)
    }

    /// Removes `quad`. Quads with an unknown term are not stored and therefore not removed.
    pub(super) fn remove(&mut self, quad: QuadRef<'_>) -> bool {
        self.encode(quad)
            .is_some_and(|encoded| self.quads.remove(&encoded))
    }

    fn encode(&self, quad: QuadRef<'_>) -> Option<EncodedQuad> {
        Some([
            self.lookup(&TermKey::from(TermRef::from(quad.subject)))?,
            self.lookup(&TermKey::from(quad.predicate))?,
            self.lookup(&TermKey::from(quad.object))?,
            self.lookup(&TermKey::graph(quad.graph_name))?,
        ])
    }

    /// Removes every quad of `graph` and returns how many were removed.
    pub(super) fn clear(&mut self, graph: GraphNameRef<'_>) -> usize {
        let Some(graph) = self.lookup(&TermKey::graph(graph)) else {
            return 0;
        };
        let before = self.quads.len();
        self.quads.retain(|quad| quad[3] != graph);
        before - self.quads.len()
    }

    /// Copies every quad of `source` into `target`. Returns the number of new quads.
    pub(super) fn copy(&mut self, source: GraphNameRef<'_>, target: GraphNameRef<'_>) -> usize {
        let Some(source) = self.lookup(&TermKey::graph(source)) else {
            return 0;
        };
        let target = self.intern(TermKey::graph(target));
        let copies = self
            .quads
            .iter()
            .filter(|quad| quad[3] == source)
            .map(|[s, p, o, _]| [*s, *p, *o, target])
            .collect::<Vec<_>>();
        copies
            .into_iter()
            .filter(|quad| self.quads.insert(*quad))
            .count()
    }

    pub(super) fn graphs(&self) -> &BTreeSet<NamedNode> {
        &self.graphs
    }

    pub(super) fn register(&mut self, graph: NamedNode) -> bool {
        self.graphs.insert(graph)
    }

    pub(super) fn unregister(&mut self, graph: &NamedNode) -> bool {
        self.graphs.remove(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::vocab::GLOBAL_GRAPH;
    use quadsql_model::{GraphName, Literal, Quad};

    fn quad(object: &str, graph: GraphName) -> Quad {
        Quad::new(
            NamedNode::new_unchecked("http://example.com/a"),
            NamedNode::new_unchecked("http://example.com/p"),
            Literal::new_simple_literal(object),
            graph,
        )
    }

    #[test]
    fn equal_terms_share_an_id() {
        let mut data = SpaceData::default();
        let a = data.intern(TermKey::iri("http://example.com/a"));
        let b = data.intern(TermKey::iri("http://example.com/a"));
        assert_eq!(a, b);
        assert_eq!(data.terms().len(), 1);
    }

    #[test]
    fn default_graph_quads_share_the_global_graph() {
        let mut data = SpaceData::default();
        assert!(data.insert(quad("1", GraphName::DefaultGraph).as_ref()));
        assert!(!data.insert(quad("1", GraphName::DefaultGraph).as_ref()));
        assert_eq!(data.clear(GraphNameRef::NamedNode(GLOBAL_GRAPH)), 1);
        assert_eq!(data.len(), 0);
    }

    #[test]
    fn copy_and_remove_work_by_id() {
        let mut data = SpaceData::default();
        let g1 = GraphName::NamedNode(NamedNode::new_unchecked("http://example.com/g1"));
        let g2 = GraphName::NamedNode(NamedNode::new_unchecked("http://example.com/g2"));
        data.insert(quad("1", g1.clone()).as_ref());
        data.insert(quad("2", g1.clone()).as_ref());
        assert_eq!(data.copy(g1.as_ref(), g2.as_ref()), 2);
        assert_eq!(data.copy(g1.as_ref(), g2.as_ref()), 0);
        assert!(data.remove(quad("1", g2.clone()).as_ref()));
        assert!(!data.remove(quad("3", g2).as_ref()));
        assert_eq!(data.len(), 3);
    }
}
