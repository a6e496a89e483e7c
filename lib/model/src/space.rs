use crate::ModelError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MAX_SPACE_ID_LEN: usize = 48;

/// Identifies a *space*, an isolated dataset with its own term and quad tables.
///
/// Space identifiers become part of SQL table names and are therefore restricted to lower-case
/// ASCII letters, digits and underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(String);

impl SpaceId {
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        let mut chars = id.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let valid_rest =
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if valid_start && valid_rest && id.len() <= MAX_SPACE_ID_LEN {
            Ok(Self(id))
        } else {
            Err(ModelError::InvalidSpaceId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SpaceId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for SpaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The physical table names of a space.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableConfig {
    /// The table holding `(subject_uuid, predicate_uuid, object_uuid, context_uuid)` rows.
    pub quad_table: String,
    /// The table holding `(term_uuid, term_text, term_type, lang, datatype)` rows.
    pub term_table: String,
}

impl TableConfig {
    /// Returns the default table names of `space`: `<space>_rdf_quad` and `<space>_term`.
    pub fn for_space(space: &SpaceId) -> Self {
        Self {
            quad_table: format!("{space}_rdf_quad"),
            term_table: format!("{space}_term"),
        }
    }

    /// Prefixes both tables with a schema name.
    #[must_use]
    pub fn with_schema(self, schema: &str) -> Self {
        Self {
            quad_table: format!("{schema}.{}", self.quad_table),
            term_table: format!("{schema}.{}", self.term_table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_ids_are_validated() {
        assert!(SpaceId::new("space_1").is_ok());
        assert!(SpaceId::new("1space").is_err());
        assert!(SpaceId::new("Space").is_err());
        assert!(SpaceId::new("a; DROP TABLE x").is_err());
        assert!(SpaceId::new("").is_err());
        assert!(SpaceId::new("a".repeat(49)).is_err());
    }

    #[test]
    fn table_names_follow_the_space() -> Result<(), ModelError> {
        let config = TableConfig::for_space(&SpaceId::new("wiki")?);
        assert_eq!(config.quad_table, "wiki_rdf_quad");
        assert_eq!(config.term_table, "wiki_term");
        assert_eq!(config.with_schema("rdf").term_table, "rdf.wiki_term");
        Ok(())
    }
}
