use crate::resolved::ResolvedTerms;
use crate::sql::FALSE_CONDITION;
use itertools::Itertools;
use quadsql_model::algebra::QueryDataset;
use quadsql_model::schema::CONTEXT_UUID;
use quadsql_model::vocab::GLOBAL_GRAPH;
use quadsql_model::{NamedNode, TermKey};

/// The graphs a quad pattern is matched against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActiveGraph {
    /// The default graph. `None` is the union of all graphs, otherwise the listed graph ids.
    Default(Option<Vec<String>>),
    /// A single named graph. `None` if the graph is not stored.
    Named(Option<String>),
    /// Any named graph, bound to the variable of `GRAPH ?g`.
    Variable(String),
}

/// The dataset scope of a pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub active: ActiveGraph,
    /// Graph ids allowed by `FROM NAMED`. `None` allows every graph.
    pub named: Option<Vec<String>>,
    /// The id of the global graph, which never binds a graph variable.
    pub global: Option<String>,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            active: ActiveGraph::Default(None),
            named: None,
            global: None,
        }
    }
}

impl Scope {
    /// Builds the scope of a query dataset (`FROM` / `FROM NAMED`, or `USING` for updates).
    pub fn from_dataset(dataset: Option<&QueryDataset>, terms: &ResolvedTerms) -> Self {
        let global = terms.id_literal(&TermKey::from(GLOBAL_GRAPH));
        let Some(dataset) = dataset else {
            return Self {
                global,
                ..Self::default()
            };
        };
        let ids = |graphs: &[NamedNode]| {
            graphs
                .iter()
                .filter_map(|g| terms.id_literal(&TermKey::from(g)))
                .collect::<Vec<_>>()
        };
        Self {
            active: ActiveGraph::Default(Some(ids(&dataset.default))),
            named: dataset.named.as_deref().map(ids),
            global,
        }
    }

    /// Returns the scope inside `GRAPH <name>`.
    #[must_use]
    pub fn with_named_graph(&self, id: Option<String>) -> Self {
        let id = id.filter(|id| self.named.as_ref().map_or(true, |named| named.contains(id)));
        Self {
            active: ActiveGraph::Named(id),
            named: self.named.clone(),
            global: self.global.clone(),
        }
    }

    /// Returns the scope inside `GRAPH ?name`.
    #[must_use]
    pub fn with_graph_variable(&self, variable: &str) -> Self {
        Self {
            active: ActiveGraph::Variable(variable.to_owned()),
            named: self.named.clone(),
            global: self.global.clone(),
        }
    }

    /// The graph variable bound by the scope, if any.
    pub fn graph_variable(&self) -> Option<&str> {
        match &self.active {
            ActiveGraph::Variable(name) => Some(name),
            ActiveGraph::Default(_) | ActiveGraph::Named(_) => None,
        }
    }

    /// Returns the conditions restricting the graph column `column` to this scope.
    pub fn graph_conditions(&self, column: &str) -> Vec<String> {
        match &self.active {
            ActiveGraph::Default(None) => Vec::new(),
            ActiveGraph::Default(Some(ids)) => vec![in_list(column, ids)],
            ActiveGraph::Named(Some(id)) => vec![format!("{column} = {id}")],
            ActiveGraph::Named(None) => vec![FALSE_CONDITION.to_owned()],
            ActiveGraph::Variable(_) => match (&self.named, &self.global) {
                (Some(ids), _) => vec![in_list(column, ids)],
                (None, Some(global)) => vec![format!("{column} <> {global}")],
                (None, None) => Vec::new(),
            },
        }
    }

    /// The graph conditions of a quad-table alias.
    pub fn quad_conditions(&self, quad_alias: &str) -> Vec<String> {
        self.graph_conditions(&format!("{quad_alias}.{CONTEXT_UUID}"))
    }
}

fn in_list(column: &str, ids: &[String]) -> String {
    if ids.is_empty() {
        FALSE_CONDITION.to_owned()
    } else {
        format!("{column} IN ({})", ids.iter().join(", "))
    }
}
