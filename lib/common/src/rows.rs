/// The rows returned by [QuadStore::execute_sql](crate::QuadStore::execute_sql).
///
/// Every cell is rendered as text; SQL `NULL` is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SqlRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SqlRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Returns the position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the cell at (`row`, `column`), `None` for NULL or out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_addressed_by_column_name() {
        let rows = SqlRows::new(
            vec!["a".to_owned(), "b".to_owned()],
            vec![vec![Some("1".to_owned()), None]],
        );
        let b = rows.column_index("b");
        assert_eq!(b, Some(1));
        assert_eq!(rows.cell(0, 0), Some("1"));
        assert_eq!(rows.cell(0, 1), None);
        assert_eq!(rows.cell(3, 0), None);
        assert_eq!(rows.len(), 1);
    }
}
