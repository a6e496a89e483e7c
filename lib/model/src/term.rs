use crate::vocab::xsd;
use crate::ModelError;
use oxrdf::{BlankNode, GraphNameRef, Literal, NamedNode, NamedNodeRef, Term, TermRef};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// The kind of a stored term, persisted as a single character in the `term_type` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    /// An IRI (`U`).
    Iri,
    /// A literal (`L`).
    Literal,
    /// A blank node (`B`).
    BlankNode,
}

impl TermKind {
    /// Returns the code stored in the term table.
    pub fn code(self) -> &'static str {
        match self {
            TermKind::Iri => "U",
            TermKind::Literal => "L",
            TermKind::BlankNode => "B",
        }
    }
}

impl FromStr for TermKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "U" => Ok(TermKind::Iri),
            "L" => Ok(TermKind::Literal),
            "B" => Ok(TermKind::BlankNode),
            _ => Err(ModelError::UnknownTermKind(s.to_owned())),
        }
    }
}

impl Display for TermKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The natural key of a stored term.
///
/// Two terms with an equal key always share the same [TermId] within a space. Language-tagged
/// literals and `xsd:string` literals store no datatype.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermKey {
    pub text: String,
    pub kind: TermKind,
    pub lang: Option<String>,
    pub datatype: Option<String>,
}

impl TermKey {
    /// Creates the key of an IRI.
    pub fn iri(iri: impl Into<String>) -> Self {
        Self {
            text: iri.into(),
            kind: TermKind::Iri,
            lang: None,
            datatype: None,
        }
    }

    /// Creates the key of a blank node with the given identifier.
    pub fn blank_node(id: impl Into<String>) -> Self {
        Self {
            text: id.into(),
            kind: TermKind::BlankNode,
            lang: None,
            datatype: None,
        }
    }

    /// Creates the key of a graph name. The default graph maps to [GLOBAL_GRAPH](crate::vocab::GLOBAL_GRAPH).
    pub fn graph(graph: GraphNameRef<'_>) -> Self {
        match graph {
            GraphNameRef::NamedNode(node) => Self::iri(node.as_str()),
            GraphNameRef::BlankNode(node) => Self::blank_node(node.as_str()),
            GraphNameRef::DefaultGraph => Self::iri(crate::vocab::GLOBAL_GRAPH.as_str()),
        }
    }

    /// Turns the key back into an RDF term.
    pub fn to_term(&self) -> Result<Term, ModelError> {
        Ok(match self.kind {
            TermKind::Iri => NamedNode::new(&self.text)
                .map_err(|e| ModelError::InvalidTerm(e.to_string()))?
                .into(),
            TermKind::BlankNode => BlankNode::new(&self.text)
                .map_err(|e| ModelError::InvalidTerm(e.to_string()))?
                .into(),
            TermKind::Literal => match (&self.lang, &self.datatype) {
                (Some(lang), _) => Literal::new_language_tagged_literal(&self.text, lang)
                    .map_err(|e| ModelError::InvalidTerm(e.to_string()))?
                    .into(),
                (None, Some(datatype)) => Literal::new_typed_literal(
                    &self.text,
                    NamedNode::new(datatype).map_err(|e| ModelError::InvalidTerm(e.to_string()))?,
                )
                .into(),
                (None, None) => Literal::new_simple_literal(&self.text).into(),
            },
        })
    }
}

impl From<TermRef<'_>> for TermKey {
    fn from(term: TermRef<'_>) -> Self {
        match term {
            TermRef::NamedNode(node) => Self::iri(node.as_str()),
            TermRef::BlankNode(node) => Self::blank_node(node.as_str()),
            TermRef::Literal(literal) => {
                let lang = literal.language().map(str::to_owned);
                let datatype = if lang.is_some() || literal.datatype() == xsd::STRING {
                    None
                } else {
                    Some(literal.datatype().as_str().to_owned())
                };
                Self {
                    text: literal.value().to_owned(),
                    kind: TermKind::Literal,
                    lang,
                    datatype,
                }
            }
        }
    }
}

impl From<&Term> for TermKey {
    fn from(term: &Term) -> Self {
        term.as_ref().into()
    }
}

impl From<NamedNodeRef<'_>> for TermKey {
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::iri(node.as_str())
    }
}

impl From<&NamedNode> for TermKey {
    fn from(node: &NamedNode) -> Self {
        Self::iri(node.as_str())
    }
}

impl Display for TermKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_term() {
            Ok(term) => write!(f, "{term}"),
            Err(_) => write!(f, "{}({})", self.kind, self.text),
        }
    }
}

/// The identifier of a stored term. Unique within a space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(Uuid);

impl TermId {
    /// Allocates a fresh, random id.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for TermId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Display for TermId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
