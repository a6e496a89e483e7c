//! Decoding of result rows into RDF terms.

use crate::error::{TranslationError, TranslationResult};
use crate::select::OutputVariable;
use crate::sql::column;
use quadsql_model::{ModelError, Term, TermKey, TermKind};

/// Decodes one term from its text, kind, language and datatype cells.
///
/// A row without text is unbound. Empty language tags and datatypes count as absent.
pub fn decode_term(
    text: Option<&str>,
    kind: Option<&str>,
    lang: Option<&str>,
    datatype: Option<&str>,
) -> Result<Option<Term>, ModelError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let kind = match kind {
        Some(kind) => kind.parse::<TermKind>()?,
        None => TermKind::Literal,
    };
    let non_empty = |value: Option<&str>| value.filter(|v| !v.is_empty()).map(str::to_owned);
    let key = TermKey {
        text: text.to_owned(),
        kind,
        lang: non_empty(lang),
        datatype: non_empty(datatype),
    };
    key.to_term().map(Some)
}

/// Locates the columns of the output variables in a result set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowDecoder {
    positions: Vec<[usize; 4]>,
}

impl RowDecoder {
    /// Creates a decoder for rows whose columns are named `columns`.
    pub fn new(variables: &[OutputVariable], columns: &[String]) -> TranslationResult<Self> {
        let position = |name: String| {
            columns.iter().position(|c| *c == name).ok_or_else(|| {
                TranslationError::Internal(format!("The result has no column {name}"))
            })
        };
        let positions = variables
            .iter()
            .map(|v| {
                Ok([
                    position(v.prefix.clone())?,
                    position(format!("{}{}", v.prefix, column::KIND))?,
                    position(format!("{}{}", v.prefix, column::LANG))?,
                    position(format!("{}{}", v.prefix, column::DATATYPE))?,
                ])
            })
            .collect::<TranslationResult<Vec<_>>>()?;
        Ok(Self { positions })
    }

    /// Decodes the values of all output variables in `row`.
    pub fn decode(&self, row: &[Option<String>]) -> Result<Vec<Option<Term>>, ModelError> {
        let cell = |i: usize| row.get(i).and_then(Option::as_deref);
        self.positions
            .iter()
            .map(|[text, kind, lang, datatype]| {
                decode_term(cell(*text), cell(*kind), cell(*lang), cell(*datatype))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadsql_model::vocab::xsd;
    use quadsql_model::{Literal, NamedNode, Variable};

    #[test]
    fn decodes_all_kinds_of_terms() {
        assert_eq!(
            decode_term(Some("http://example.com/a"), Some("U"), None, None).unwrap(),
            Some(NamedNode::new_unchecked("http://example.com/a").into())
        );
        assert_eq!(
            decode_term(Some("chat"), Some("L"), Some("fr"), None).unwrap(),
            Some(Literal::new_language_tagged_literal_unchecked("chat", "fr").into())
        );
        assert_eq!(
            decode_term(Some("1"), Some("L"), Some(""), Some(xsd::INTEGER.as_str())).unwrap(),
            Some(Literal::new_typed_literal("1", xsd::INTEGER).into())
        );
        assert_eq!(decode_term(None, Some("U"), None, None).unwrap(), None);
        assert!(decode_term(Some("a"), Some("X"), None, None).is_err());
    }

    #[test]
    fn rows_are_decoded_by_column_name() {
        let variables = vec![OutputVariable {
            variable: Variable::new_unchecked("o"),
            prefix: "c0".to_owned(),
        }];
        let columns = ["c0__dt", "c0", "c0__kind", "c0__lang"]
            .map(str::to_owned)
            .to_vec();
        let decoder = RowDecoder::new(&variables, &columns).unwrap();
        let row = vec![None, Some("v".to_owned()), Some("L".to_owned()), None];
        assert_eq!(
            decoder.decode(&row).unwrap(),
            vec![Some(Literal::new_simple_literal("v").into())]
        );
        assert!(RowDecoder::new(&variables, &columns[..2]).is_err());
    }
}
