use rustc_hash::FxHashMap;

/// The kinds of SQL identifiers handed out by an [AliasGenerator].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AliasKind {
    /// An instance of the quad table.
    Quad,
    /// A join with the term table.
    Term,
    /// A derived table wrapping a self-contained sub-statement.
    Subquery,
    /// A derived table wrapping a `UNION ALL`.
    Union,
    /// A derived table wrapping inline `VALUES` rows.
    Values,
    /// A derived table wrapping a property path relation.
    Path,
    /// A recursive common table expression.
    Recursive,
    /// A hidden variable introduced by the translation.
    Variable,
}

impl AliasKind {
    fn tag(self) -> &'static str {
        match self {
            AliasKind::Quad => "q",
            AliasKind::Term => "t",
            AliasKind::Subquery => "s",
            AliasKind::Union => "u",
            AliasKind::Values => "v",
            AliasKind::Path => "pp",
            AliasKind::Recursive => "r",
            AliasKind::Variable => "h",
        }
    }
}

/// Hands out SQL aliases that never collide within one translation.
///
/// Every generator owns a prefix. Independently compiled branches (join operands, union branches,
/// sub-selects, ...) receive a [child](Self::child) generator whose prefix extends the parent's
/// prefix with a fresh branch number, so siblings can never produce the same alias.
#[derive(Debug, Default)]
pub struct AliasGenerator {
    prefix: String,
    counters: FxHashMap<AliasKind, usize>,
    children: usize,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next alias of the given kind, e.g. `q0` or `b1_t3`.
    pub fn next(&mut self, kind: AliasKind) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        let alias = format!("{}{}{}", self.prefix, kind.tag(), counter);
        *counter += 1;
        alias
    }

    /// Creates an independent namespace for a nested branch.
    pub fn child(&mut self) -> AliasGenerator {
        let prefix = format!("{}b{}_", self.prefix, self.children);
        self.children += 1;
        AliasGenerator {
            prefix,
            counters: FxHashMap::default(),
            children: 0,
        }
    }

    /// Returns a fresh name for a hidden variable. Hidden variables are never projected.
    pub fn hidden_variable(&mut self) -> String {
        format!("#{}", self.next(AliasKind::Variable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn aliases_are_counted_per_kind() {
        let mut aliases = AliasGenerator::new();
        assert_eq!(aliases.next(AliasKind::Quad), "q0");
        assert_eq!(aliases.next(AliasKind::Quad), "q1");
        assert_eq!(aliases.next(AliasKind::Term), "t0");
        assert_eq!(aliases.next(AliasKind::Path), "pp0");
    }

    #[test]
    fn sibling_namespaces_never_collide() {
        let mut root = AliasGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..3 {
            let mut child = root.child();
            let mut grand_child = child.child();
            for _ in 0..3 {
                assert!(seen.insert(child.next(AliasKind::Quad)));
                assert!(seen.insert(grand_child.next(AliasKind::Quad)));
            }
            assert!(seen.insert(root.next(AliasKind::Quad)));
        }
        assert!(seen.contains("b0_b0_q2"));
    }

    #[test]
    fn hidden_variables_are_prefixed() {
        let mut root = AliasGenerator::new();
        let mut child = root.child();
        assert_eq!(child.hidden_variable(), "#b0_h0");
    }
}
