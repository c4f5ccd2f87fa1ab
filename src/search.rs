use crate::column::ColumnSet;
use crate::row::Row;

/// Keep rows where any column's display string contains `query`, ignoring case.
///
/// A blank query returns `rows` untouched. Every column is scanned regardless of
/// its sortable/filterable flags, and the input order is preserved.
pub fn search<'a>(rows: Vec<&'a Row>, query: &str, columns: &ColumnSet) -> Vec<&'a Row> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| row_matches(row, &needle, columns))
        .collect()
}

/// `needle` must already be lowercase.
pub(crate) fn row_matches(row: &Row, needle: &str, columns: &ColumnSet) -> bool {
    columns.iter().any(|column| {
        columns
            .display_string(row, column)
            .to_lowercase()
            .contains(needle)
    })
}
