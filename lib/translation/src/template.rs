//! Instantiation of `CONSTRUCT` templates and update templates with solutions.

use quadsql_model::algebra_term::{
    GraphNamePattern, GroundQuadPattern, GroundTerm, GroundTermPattern, NamedNodePattern,
    QuadPattern, TermPattern, TriplePattern,
};
use quadsql_model::{BlankNode, GraphName, NamedNode, Quad, Subject, Term, Triple, Variable};
use rustc_hash::FxHashMap;

/// The values of one solution.
#[derive(Clone, Copy, Debug)]
pub struct Solution<'a> {
    variables: &'a [Variable],
    values: &'a [Option<Term>],
}

impl<'a> Solution<'a> {
    pub fn new(variables: &'a [Variable], values: &'a [Option<Term>]) -> Self {
        Self { variables, values }
    }

    pub fn get(&self, variable: &Variable) -> Option<&'a Term> {
        let position = self.variables.iter().position(|v| v == variable)?;
        self.values.get(position)?.as_ref()
    }
}

/// Instantiates templates for one solution.
///
/// Template blank nodes are replaced by the same fresh blank node within one solution and by
/// different ones across solutions.
#[derive(Debug, Default)]
pub struct TemplateInstantiator {
    blank_nodes: FxHashMap<String, BlankNode>,
}

impl TemplateInstantiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates a triple template. Returns `None` if a variable is unbound or a term is not
    /// allowed in its position.
    pub fn triple(&mut self, pattern: &TriplePattern, solution: &Solution<'_>) -> Option<Triple> {
        Some(Triple::new(
            self.subject(&pattern.subject, solution)?,
            predicate(&pattern.predicate, solution)?,
            self.term(&pattern.object, solution)?,
        ))
    }

    /// Instantiates an `INSERT` quad template.
    pub fn quad(&mut self, pattern: &QuadPattern, solution: &Solution<'_>) -> Option<Quad> {
        Some(Quad::new(
            self.subject(&pattern.subject, solution)?,
            predicate(&pattern.predicate, solution)?,
            self.term(&pattern.object, solution)?,
            graph_name(&pattern.graph_name, solution)?,
        ))
    }

    fn subject(&mut self, pattern: &TermPattern, solution: &Solution<'_>) -> Option<Subject> {
        match self.term(pattern, solution)? {
            Term::NamedNode(node) => Some(node.into()),
            Term::BlankNode(node) => Some(node.into()),
            Term::Literal(_) => None,
        }
    }

    fn term(&mut self, pattern: &TermPattern, solution: &Solution<'_>) -> Option<Term> {
        match pattern {
            TermPattern::NamedNode(node) => Some(node.clone().into()),
            TermPattern::Literal(literal) => Some(literal.clone().into()),
            TermPattern::BlankNode(node) => Some(
                self.blank_nodes
                    .entry(node.as_str().to_owned())
                    .or_default()
                    .clone()
                    .into(),
            ),
            TermPattern::Variable(v) => solution.get(v).cloned(),
        }
    }
}

/// Instantiates a `DELETE` quad template. Ground templates contain no blank nodes.
pub fn ground_quad(pattern: &GroundQuadPattern, solution: &Solution<'_>) -> Option<Quad> {
    let term = |pattern: &GroundTermPattern| match pattern {
        GroundTermPattern::NamedNode(node) => Some(Term::from(node.clone())),
        GroundTermPattern::Literal(literal) => Some(Term::from(literal.clone())),
        GroundTermPattern::Variable(v) => solution.get(v).cloned(),
    };
    let subject = match term(&pattern.subject)? {
        Term::NamedNode(node) => Subject::from(node),
        Term::BlankNode(node) => Subject::from(node),
        Term::Literal(_) => return None,
    };
    Some(Quad::new(
        subject,
        predicate(&pattern.predicate, solution)?,
        term(&pattern.object)?,
        graph_name(&pattern.graph_name, solution)?,
    ))
}

/// Converts a ground term of a `VALUES` clause or a data block into a term.
pub fn ground_term(term: &GroundTerm) -> Term {
    match term {
        GroundTerm::NamedNode(node) => node.clone().into(),
        GroundTerm::Literal(literal) => literal.clone().into(),
    }
}

fn predicate(pattern: &NamedNodePattern, solution: &Solution<'_>) -> Option<NamedNode> {
    match pattern {
        NamedNodePattern::NamedNode(node) => Some(node.clone()),
        NamedNodePattern::Variable(v) => match solution.get(v)? {
            Term::NamedNode(node) => Some(node.clone()),
            Term::BlankNode(_) | Term::Literal(_) => None,
        },
    }
}

fn graph_name(pattern: &GraphNamePattern, solution: &Solution<'_>) -> Option<GraphName> {
    match pattern {
        GraphNamePattern::NamedNode(node) => Some(node.clone().into()),
        GraphNamePattern::DefaultGraph => Some(GraphName::DefaultGraph),
        GraphNamePattern::Variable(v) => match solution.get(v)? {
            Term::NamedNode(node) => Some(node.clone().into()),
            Term::BlankNode(_) | Term::Literal(_) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::{Literal, Query};

    #[test]
    fn blank_nodes_are_fresh_per_solution() -> Result<(), Box<dyn std::error::Error>> {
        let query = Query::parse(
            "CONSTRUCT { _:b <http://example.com/name> ?name } WHERE { ?s ?p ?name }",
            None,
        )?;
        let Query::Construct { template, .. } = &query else {
            unreachable!()
        };
        let variables = [Variable::new("name")?];
        let values: [Option<Term>; 1] = [Some(Literal::new_simple_literal("a").into())];
        let solution = Solution::new(&variables, &values);

        let mut first = TemplateInstantiator::new();
        let a = first.triple(&template[0], &solution).unwrap();
        let b = first.triple(&template[0], &solution).unwrap();
        let c = TemplateInstantiator::new()
            .triple(&template[0], &solution)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a.subject, c.subject);
        Ok(())
    }

    #[test]
    fn literals_cannot_be_subjects() -> Result<(), Box<dyn std::error::Error>> {
        let query = Query::parse("CONSTRUCT { ?x ?x ?x } WHERE { ?x ?p ?o }", None)?;
        let Query::Construct { template, .. } = &query else {
            unreachable!()
        };
        let variables = [Variable::new("x")?];
        let literal: [Option<Term>; 1] = [Some(Literal::new_simple_literal("a").into())];
        let iri: [Option<Term>; 1] = [Some(NamedNode::new("http://example.com/x")?.into())];
        let mut instantiator = TemplateInstantiator::new();
        assert!(instantiator
            .triple(&template[0], &Solution::new(&variables, &literal))
            .is_none());
        assert!(instantiator
            .triple(&template[0], &Solution::new(&variables, &iri))
            .is_some());
        Ok(())
    }
}
