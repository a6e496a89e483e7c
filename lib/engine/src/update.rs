//! Application of SPARQL update operations.
//!
//! Data blocks are written in batches. `DELETE`/`INSERT ... WHERE` evaluates the `WHERE` clause
//! with the query translator and instantiates the templates once per solution. Graph management
//! maps onto the graph registry of the store. The default graph is the global graph.

use crate::engine::QueryEngine;
use crate::error::QueryEvaluationError;
use crate::options::UpdateOptions;
use itertools::Itertools;
use oxrdfio::{RdfFormat, RdfParser};
use quadsql_model::algebra::{GraphPattern, GraphTarget, QueryDataset};
use quadsql_model::algebra_term::{
    self, GraphNamePattern, GroundQuad, GroundQuadPattern, GroundSubject, GroundTermPattern,
    NamedNodePattern, QuadPattern, TermPattern, TriplePattern,
};
use quadsql_model::vocab::GLOBAL_GRAPH;
use quadsql_model::{
    BlankNode, GraphName, GraphUpdateOperation, NamedNode, Quad, SpaceId, Subject, Term, TermKey,
    Variable,
};
use quadsql_translation::{
    collect_dataset_terms, collect_pattern_terms, ground_quad, ground_term, QueryForm,
    QueryTranslator, RowDecoder, Solution, TemplateInstantiator,
};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Applies the operations of one update to one space.
pub(crate) struct UpdateExecutor<'a> {
    engine: &'a QueryEngine,
    space: &'a SpaceId,
    options: &'a UpdateOptions,
}

impl<'a> UpdateExecutor<'a> {
    pub(crate) fn new(engine: &'a QueryEngine, space: &'a SpaceId, options: &'a UpdateOptions) -> Self {
        Self {
            engine,
            space,
            options,
        }
    }

    pub(crate) async fn apply(
        &self,
        operation: &GraphUpdateOperation,
    ) -> Result<(), QueryEvaluationError> {
        match operation {
            GraphUpdateOperation::InsertData { data } => {
                let mut blank_nodes = FxHashMap::default();
                let quads = data
                    .iter()
                    .map(|quad| {
                        Quad::new(
                            fresh_subject(&quad.subject, &mut blank_nodes),
                            quad.predicate.clone(),
                            fresh_term(&quad.object, &mut blank_nodes),
                            graph_name(&quad.graph_name),
                        )
                    })
                    .collect();
                self.insert(quads).await
            }
            GraphUpdateOperation::DeleteData { data } => {
                let quads = data.iter().map(ground_data_quad).collect();
                self.remove(quads).await
            }
            GraphUpdateOperation::DeleteInsert {
                delete,
                insert,
                using,
                pattern,
            } => {
                if let Some((source, target)) = copy_shape(delete, insert, using.as_ref(), pattern)
                {
                    return self.copy(source, target).await;
                }
                self.delete_insert(delete, insert, using.as_ref(), pattern)
                    .await
            }
            GraphUpdateOperation::Load {
                silent,
                source,
                destination,
            } => {
                let result = self.load(source, graph_name(destination)).await;
                silence(result, *silent)
            }
            GraphUpdateOperation::Clear { silent, graph } => {
                self.clear(graph, *silent, false).await
            }
            GraphUpdateOperation::Create { silent, graph } => self.create(graph, *silent).await,
            GraphUpdateOperation::Drop { silent, graph } => self.clear(graph, *silent, true).await,
        }
    }

    async fn insert(&self, quads: Vec<Quad>) -> Result<(), QueryEvaluationError> {
        if quads.is_empty() {
            return Ok(());
        }
        self.register_graphs_of(&quads).await?;
        let inserted = self
            .engine
            .store()
            .write_quads_batch(self.space, quads)
            .await?;
        tracing::debug!(space = %self.space, inserted, "Inserted quads");
        Ok(())
    }

    async fn remove(&self, quads: Vec<Quad>) -> Result<(), QueryEvaluationError> {
        if quads.is_empty() {
            return Ok(());
        }
        let removed = self
            .engine
            .store()
            .remove_quads_batch(self.space, quads)
            .await?;
        tracing::debug!(space = %self.space, removed, "Removed quads");
        Ok(())
    }

    /// Registers the named graphs of `quads` that are not registered yet, with one lookup and
    /// at most one registration call.
    async fn register_graphs_of(&self, quads: &[Quad]) -> Result<(), QueryEvaluationError> {
        let graphs = quads
            .iter()
            .filter_map(|quad| match &quad.graph_name {
                GraphName::NamedNode(graph) if graph.as_ref() != GLOBAL_GRAPH => {
                    Some(graph.clone())
                }
                GraphName::NamedNode(_) | GraphName::BlankNode(_) | GraphName::DefaultGraph => {
                    None
                }
            })
            .unique()
            .collect::<Vec<_>>();
        if graphs.is_empty() {
            return Ok(());
        }
        let store = self.engine.store();
        let registered = store.registered_graphs(self.space, &graphs).await?;
        let missing = graphs
            .into_iter()
            .filter(|graph| !registered.contains(graph))
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            store.register_graphs(self.space, &missing).await?;
        }
        Ok(())
    }

    async fn delete_insert(
        &self,
        delete: &[GroundQuadPattern],
        insert: &[QuadPattern],
        using: Option<&QueryDataset>,
        pattern: &GraphPattern,
    ) -> Result<(), QueryEvaluationError> {
        let mut keys = BTreeSet::from([TermKey::from(GLOBAL_GRAPH)]);
        collect_pattern_terms(pattern, &mut keys);
        if let Some(using) = using {
            collect_dataset_terms(using, &mut keys);
        }
        let store = self.engine.store();
        let terms = self
            .engine
            .resolver()
            .resolve(store, self.space, keys)
            .await?;

        let tables = store.table_config(self.space);
        let translated = QueryTranslator::new(
            &tables,
            &terms,
            &self.options.query_options.translation,
        )
        .translate_solutions(
            pattern,
            using,
            Some(template_variables(delete, insert)),
            QueryForm::Select,
        )?;
        for diagnostic in &translated.diagnostics {
            tracing::warn!(space = %self.space, %diagnostic, "Translation diagnostic");
        }
        let rows = store.execute_sql(self.space, &translated.sql).await?;

        let decoder = RowDecoder::new(&translated.variables, &rows.columns)?;
        let variables = translated
            .variables
            .iter()
            .map(|v| v.variable.clone())
            .collect::<Vec<_>>();
        let mut deletions = Vec::new();
        let mut insertions = Vec::new();
        for row in &rows.rows {
            let values = decoder.decode(row)?;
            let solution = Solution::new(&variables, &values);
            deletions.extend(delete.iter().filter_map(|quad| ground_quad(quad, &solution)));
            let mut instantiator = TemplateInstantiator::new();
            insertions.extend(
                insert
                    .iter()
                    .filter_map(|quad| instantiator.quad(quad, &solution)),
            );
        }
        tracing::debug!(
            space = %self.space,
            solutions = rows.len(),
            deletions = deletions.len(),
            insertions = insertions.len(),
            "Instantiated update templates"
        );

        self.remove(deletions).await?;
        self.insert(insertions).await
    }

    /// Copies every quad of `source` into `target` by term id.
    async fn copy(&self, source: NamedNode, target: NamedNode) -> Result<(), QueryEvaluationError> {
        if source == target {
            return Ok(());
        }
        let store = self.engine.store();
        if target.as_ref() != GLOBAL_GRAPH
            && store
                .registered_graphs(self.space, std::slice::from_ref(&target))
                .await?
                .is_empty()
        {
            store
                .register_graphs(self.space, std::slice::from_ref(&target))
                .await?;
        }
        let copied = store
            .copy_quads_between_graphs(self.space, &source, &target)
            .await?;
        tracing::debug!(space = %self.space, %source, %target, copied, "Copied graph");
        Ok(())
    }

    async fn load(&self, source: &NamedNode, destination: GraphName) -> Result<(), QueryEvaluationError> {
        let loader = self
            .engine
            .loader()
            .ok_or_else(|| QueryEvaluationError::NoDocumentLoader(source.clone()))?;
        let document = loader.fetch(source).await?;
        let format = match &document.content_type {
            Some(content_type) => RdfFormat::from_media_type(content_type)
                .ok_or_else(|| QueryEvaluationError::UnsupportedContentType(content_type.clone()))?,
            None => format_of_extension(source)
                .ok_or_else(|| QueryEvaluationError::UnsupportedContentType(source.to_string()))?,
        };
        let quads = RdfParser::from_format(format)
            .with_base_iri(source.as_str())
            .map_err(|e| QueryEvaluationError::InternalError(e.to_string()))?
            .with_default_graph(destination)
            .rename_blank_nodes()
            .for_reader(document.body.as_slice())
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(space = %self.space, %source, quads = quads.len(), "Parsed document");
        self.insert(quads).await
    }

    async fn create(&self, graph: &NamedNode, silent: bool) -> Result<(), QueryEvaluationError> {
        let store = self.engine.store();
        let graphs = std::slice::from_ref(graph);
        if !store.registered_graphs(self.space, graphs).await?.is_empty() {
            return if silent {
                Ok(())
            } else {
                Err(QueryEvaluationError::GraphAlreadyExists(graph.clone()))
            };
        }
        store.register_graphs(self.space, graphs).await?;
        Ok(())
    }

    /// Implements `CLEAR` and, with `unregister`, `DROP`.
    async fn clear(
        &self,
        target: &GraphTarget,
        silent: bool,
        unregister: bool,
    ) -> Result<(), QueryEvaluationError> {
        let store = self.engine.store();
        let (named, default) = match target {
            GraphTarget::NamedNode(graph) if graph.as_ref() == GLOBAL_GRAPH => (Vec::new(), true),
            GraphTarget::NamedNode(graph) => {
                let graphs = std::slice::from_ref(graph);
                if store.registered_graphs(self.space, graphs).await?.is_empty() {
                    if silent {
                        return Ok(());
                    }
                    return Err(QueryEvaluationError::GraphDoesNotExist(graph.clone()));
                }
                (vec![graph.clone()], false)
            }
            GraphTarget::DefaultGraph => (Vec::new(), true),
            GraphTarget::NamedGraphs => (store.list_graphs(self.space).await?, false),
            GraphTarget::AllGraphs => (store.list_graphs(self.space).await?, true),
        };

        for graph in &named {
            let removed = store.clear_graph_quads(self.space, graph).await?;
            if unregister {
                store.unregister_graph(self.space, graph).await?;
            }
            tracing::debug!(space = %self.space, %graph, removed, unregister, "Cleared graph");
        }
        if default {
            let global = GLOBAL_GRAPH.into_owned();
            let removed = store.clear_graph_quads(self.space, &global).await?;
            tracing::debug!(space = %self.space, removed, "Cleared default graph");
        }
        Ok(())
    }
}

fn silence(result: Result<(), QueryEvaluationError>, silent: bool) -> Result<(), QueryEvaluationError> {
    match result {
        Err(error) if silent => {
            tracing::debug!(%error, "Ignoring error of silent operation");
            Ok(())
        }
        result => result,
    }
}

/// Recognizes the "insert every triple of graph A into graph B" shape that `ADD`, `COPY` and
/// `MOVE` between named graphs are expanded into. Returns the source and target graphs.
///
/// A pattern outside of `GRAPH` reads the union of all graphs and is evaluated like any other
/// `WHERE` clause.
fn copy_shape(
    delete: &[GroundQuadPattern],
    insert: &[QuadPattern],
    using: Option<&QueryDataset>,
    pattern: &GraphPattern,
) -> Option<(NamedNode, NamedNode)> {
    let ([], [target], None) = (delete, insert, using) else {
        return None;
    };
    let (source, inner) = match pattern {
        GraphPattern::Graph {
            name: NamedNodePattern::NamedNode(source),
            inner,
        } => (source.clone(), inner.as_ref()),
        _ => return None,
    };
    let GraphPattern::Bgp { patterns } = inner else {
        return None;
    };
    let [TriplePattern {
        subject: TermPattern::Variable(s),
        predicate: NamedNodePattern::Variable(p),
        object: TermPattern::Variable(o),
    }] = patterns.as_slice()
    else {
        return None;
    };
    let distinct = s != p && p != o && s != o;
    let same_triple = matches!(
        (&target.subject, &target.predicate, &target.object),
        (TermPattern::Variable(ts), NamedNodePattern::Variable(tp), TermPattern::Variable(to))
            if ts == s && tp == p && to == o
    );
    let target = match &target.graph_name {
        GraphNamePattern::NamedNode(target) => target.clone(),
        GraphNamePattern::DefaultGraph => GLOBAL_GRAPH.into_owned(),
        GraphNamePattern::Variable(_) => return None,
    };
    (distinct && same_triple).then_some((source, target))
}

/// The variables of the update templates, in order of first appearance.
fn template_variables(delete: &[GroundQuadPattern], insert: &[QuadPattern]) -> Vec<String> {
    let mut keys = Vec::<String>::new();
    let mut push = |v: &Variable| {
        if !keys.iter().any(|k| k == v.as_str()) {
            keys.push(v.as_str().to_owned());
        }
    };
    for quad in delete {
        for term in [&quad.subject, &quad.object] {
            if let GroundTermPattern::Variable(v) = term {
                push(v);
            }
        }
        if let NamedNodePattern::Variable(v) = &quad.predicate {
            push(v);
        }
        if let GraphNamePattern::Variable(v) = &quad.graph_name {
            push(v);
        }
    }
    for quad in insert {
        for term in [&quad.subject, &quad.object] {
            if let TermPattern::Variable(v) = term {
                push(v);
            }
        }
        if let NamedNodePattern::Variable(v) = &quad.predicate {
            push(v);
        }
        if let GraphNamePattern::Variable(v) = &quad.graph_name {
            push(v);
        }
    }
    keys
}

fn graph_name(graph: &algebra_term::GraphName) -> GraphName {
    match graph {
        algebra_term::GraphName::NamedNode(graph) => graph.clone().into(),
        algebra_term::GraphName::DefaultGraph => GraphName::DefaultGraph,
    }
}

fn ground_data_quad(quad: &GroundQuad) -> Quad {
    let GroundSubject::NamedNode(subject) = &quad.subject;
    Quad::new(
        subject.clone(),
        quad.predicate.clone(),
        ground_term(&quad.object),
        graph_name(&quad.graph_name),
    )
}

/// Blank nodes of a data block denote fresh nodes. Equal labels within one operation denote the
/// same node.
fn fresh_blank_node(node: &BlankNode, blank_nodes: &mut FxHashMap<BlankNode, BlankNode>) -> BlankNode {
    blank_nodes.entry(node.clone()).or_default().clone()
}

fn fresh_subject(subject: &Subject, blank_nodes: &mut FxHashMap<BlankNode, BlankNode>) -> Subject {
    match subject {
        Subject::NamedNode(node) => node.clone().into(),
        Subject::BlankNode(node) => fresh_blank_node(node, blank_nodes).into(),
    }
}

fn fresh_term(term: &Term, blank_nodes: &mut FxHashMap<BlankNode, BlankNode>) -> Term {
    match term {
        Term::BlankNode(node) => fresh_blank_node(node, blank_nodes).into(),
        Term::NamedNode(_) | Term::Literal(_) => term.clone(),
    }
}

/// Guesses the format of a document without media type from the extension of its IRI.
fn format_of_extension(iri: &NamedNode) -> Option<RdfFormat> {
    let path = iri.as_str().split(['?', '#']).next()?;
    let (_, extension) = path.rsplit_once('/')?.1.rsplit_once('.')?;
    RdfFormat::from_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::Update;

    fn operations(update: &str) -> Vec<GraphUpdateOperation> {
        Update::parse(update, None).unwrap().operations
    }

    #[test]
    fn add_is_recognized_as_a_copy() {
        let operations = operations("ADD GRAPH <http://example.com/a> TO <http://example.com/b>");
        let [GraphUpdateOperation::DeleteInsert {
            delete,
            insert,
            using,
            pattern,
        }] = operations.as_slice()
        else {
            panic!("unexpected expansion: {operations:?}");
        };
        assert_eq!(
            copy_shape(delete, insert, using.as_ref(), pattern),
            Some((
                NamedNode::new_unchecked("http://example.com/a"),
                NamedNode::new_unchecked("http://example.com/b")
            ))
        );
    }

    #[test]
    fn copy_from_default_is_evaluated_as_a_pattern() {
        let operations = operations("COPY DEFAULT TO <http://example.com/b>");
        let shapes = operations
            .iter()
            .filter_map(|operation| match operation {
                GraphUpdateOperation::DeleteInsert {
                    delete,
                    insert,
                    using,
                    pattern,
                } => copy_shape(delete, insert, using.as_ref(), pattern),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert!(shapes.is_empty());
    }

    #[test]
    fn regular_updates_are_not_copies() {
        let operations = operations(
            "INSERT { GRAPH <http://example.com/b> { ?s ?p ?o } } \
             WHERE { GRAPH <http://example.com/a> { ?s ?p ?o FILTER(isIRI(?o)) } }",
        );
        let [GraphUpdateOperation::DeleteInsert {
            delete,
            insert,
            using,
            pattern,
        }] = operations.as_slice()
        else {
            panic!("unexpected expansion: {operations:?}");
        };
        assert_eq!(copy_shape(delete, insert, using.as_ref(), pattern), None);
    }

    #[test]
    fn template_variables_keep_their_first_position() {
        let operations = operations(
            "DELETE { ?a <http://example.com/p> ?b } INSERT { GRAPH ?g { ?b ?q ?a } } WHERE { ?a ?q ?b }",
        );
        let [GraphUpdateOperation::DeleteInsert { delete, insert, .. }] = operations.as_slice()
        else {
            panic!("unexpected expansion: {operations:?}");
        };
        assert_eq!(template_variables(delete, insert), vec!["a", "b", "q", "g"]);
    }

    #[test]
    fn formats_are_guessed_from_extensions() {
        let iri = |iri: &str| NamedNode::new_unchecked(iri);
        assert_eq!(
            format_of_extension(&iri("http://example.com/data.ttl?x=1")),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(
            format_of_extension(&iri("http://example.com/data.nq")),
            Some(RdfFormat::NQuads)
        );
        assert_eq!(format_of_extension(&iri("http://example.com/data")), None);
    }
}
