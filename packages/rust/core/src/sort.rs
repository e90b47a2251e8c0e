//! Client-side column sort with toggling direction.
//!
//! A pure, synchronous reorder of the rows currently in the table body —
//! no network or cache effect, and no interaction with the enrichment
//! pipeline. Direction state lives on the table, per column: the first sort
//! of a column is ascending and each repeat flips it.

use crate::table::TableModel;

/// Sort direction for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Reorder `table`'s body rows by the text of `column_index`.
///
/// Comparison is case-insensitive on trimmed cell text; a row missing the
/// cell sorts as the empty string. Returns the direction applied.
pub fn sort_by_column(table: &mut TableModel, column_index: usize) -> SortDirection {
    let direction = match table.sort_directions.get(&column_index) {
        Some(SortDirection::Ascending) => SortDirection::Descending,
        _ => SortDirection::Ascending,
    };
    table.sort_directions.insert(column_index, direction);

    table.rows.sort_by(|a, b| {
        let a_key = sort_key(a, column_index);
        let b_key = sort_key(b, column_index);
        match direction {
            SortDirection::Ascending => a_key.cmp(&b_key),
            SortDirection::Descending => b_key.cmp(&a_key),
        }
    });

    direction
}

fn sort_key(row: &crate::table::TableRow, column_index: usize) -> String {
    row.cells
        .get(column_index)
        .map(|cell| cell.text.trim().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, TableRow};

    fn table_with(values: &[&str]) -> TableModel {
        let mut table = TableModel::default();
        for v in values {
            table.rows.push(TableRow {
                cells: vec![Cell::new(*v)],
            });
        }
        table
    }

    fn column(table: &TableModel, index: usize) -> Vec<String> {
        table
            .rows
            .iter()
            .map(|r| r.cells.get(index).map(|c| c.text.clone()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn first_sort_ascends_then_toggles() {
        let mut table = table_with(&["B", "A", "C"]);

        assert_eq!(sort_by_column(&mut table, 0), SortDirection::Ascending);
        assert_eq!(column(&table, 0), vec!["A", "B", "C"]);

        assert_eq!(sort_by_column(&mut table, 0), SortDirection::Descending);
        assert_eq!(column(&table, 0), vec!["C", "B", "A"]);

        assert_eq!(sort_by_column(&mut table, 0), SortDirection::Ascending);
        assert_eq!(column(&table, 0), vec!["A", "B", "C"]);
    }

    #[test]
    fn direction_state_is_per_column() {
        let mut table = TableModel::default();
        for (a, b) in [("B", "2"), ("A", "1")] {
            table.rows.push(TableRow {
                cells: vec![Cell::new(a), Cell::new(b)],
            });
        }

        assert_eq!(sort_by_column(&mut table, 0), SortDirection::Ascending);
        // A fresh column starts ascending regardless of column 0's state.
        assert_eq!(sort_by_column(&mut table, 1), SortDirection::Ascending);
        assert_eq!(sort_by_column(&mut table, 0), SortDirection::Descending);
    }

    #[test]
    fn missing_cells_sort_as_empty() {
        let mut table = table_with(&["B", "A"]);
        table.rows.push(TableRow { cells: vec![] });

        sort_by_column(&mut table, 0);
        assert_eq!(column(&table, 0), vec!["", "A", "B"]);
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        let mut table = table_with(&["  b ", "A", "c"]);
        sort_by_column(&mut table, 0);
        assert_eq!(column(&table, 0), vec!["A", "  b ", "c"]);
    }
}
