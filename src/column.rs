//! Column definitions and the column set a table is configured with.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::cell::{to_display_string, CellValue, ColumnType, DisplayOptions};
use crate::registry::FormatterRegistry;
use crate::row::Row;

pub type FormatFn = Arc<dyn Fn(&CellValue) -> String + Send + Sync>;
pub type CompareFn = Arc<dyn Fn(&CellValue, &CellValue) -> Ordering + Send + Sync>;

/// Optional per-column overrides of the default formatting and ordering.
#[derive(Clone, Default)]
pub struct ColumnStrategy {
    pub formatter: Option<FormatFn>,
    /// Orders two present values; absent values stay last regardless.
    pub comparator: Option<CompareFn>,
}

impl fmt::Debug for ColumnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnStrategy")
            .field("formatter", &self.formatter.as_ref().map(|_| "<fn>"))
            .field("comparator", &self.comparator.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Static description of one column.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    pub kind: Option<ColumnType>,
    pub sortable: bool,
    pub filterable: bool,
    /// Text sorts ignore case unless this is set.
    pub case_sensitive: bool,
    /// Lower values are kept first when not every column fits.
    pub priority: u32,
    /// Name of a registry formatter, bound by [`ColumnSet::resolve_formatters`].
    pub formatter_id: Option<String>,
    pub strategy: ColumnStrategy,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind: None,
            sortable: true,
            filterable: true,
            case_sensitive: false,
            priority: 0,
            formatter_id: None,
            strategy: ColumnStrategy::default(),
        }
    }

    pub fn with_type(mut self, kind: ColumnType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_formatter_id(mut self, id: impl Into<String>) -> Self {
        self.formatter_id = Some(id.into());
        self
    }

    pub fn with_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&CellValue) -> String + Send + Sync + 'static,
    {
        self.strategy.formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&CellValue, &CellValue) -> Ordering + Send + Sync + 'static,
    {
        self.strategy.comparator = Some(Arc::new(comparator));
        self
    }
}

/// The ordered, read-only set of columns a table is configured with, plus the
/// display tokens used to render its cells.
#[derive(Debug, Clone, Default)]
pub struct ColumnSet {
    columns: Vec<ColumnDef>,
    display: DisplayOptions,
}

impl ColumnSet {
    /// Build a column set. When keys repeat, the first definition wins.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        let mut unique: Vec<ColumnDef> = Vec::with_capacity(columns.len());
        for column in columns {
            if unique.iter().any(|c| c.key == column.key) {
                tracing::warn!(key = %column.key, "duplicate column key ignored");
                continue;
            }
            unique.push(column);
        }
        Self {
            columns: unique,
            display: DisplayOptions::default(),
        }
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    /// Derive columns from the keys present in `rows` (first-seen order) and
    /// infer each column's type from its values.
    pub fn infer(rows: &[Row]) -> Self {
        let mut keys: Vec<&str> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        Self::infer_ordered(rows, &keys)
    }

    /// Like [`infer`](Self::infer) but with the column order given by `keys`.
    pub fn infer_ordered<K: AsRef<str>>(rows: &[Row], keys: &[K]) -> Self {
        let columns = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                ColumnDef::new(key, key).with_type(infer_column_type(rows, key))
            })
            .collect();
        Self::new(columns)
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ColumnDef> {
        self.columns.iter_mut().find(|c| c.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn display(&self) -> &DisplayOptions {
        &self.display
    }

    /// Display string of `row`'s cell in `column`.
    pub fn display_string(&self, row: &Row, column: &ColumnDef) -> String {
        to_display_string(row.get(&column.key), column, &self.display)
    }

    /// Up to `max` columns, chosen by ascending priority (ties by position) and
    /// returned in their configured order.
    pub fn visible_columns(&self, max: usize) -> Vec<&ColumnDef> {
        let mut ranked: Vec<(usize, &ColumnDef)> = self.columns.iter().enumerate().collect();
        ranked.sort_by_key(|(idx, c)| (c.priority, *idx));
        ranked.truncate(max);
        ranked.sort_by_key(|(idx, _)| *idx);
        ranked.into_iter().map(|(_, c)| c).collect()
    }

    /// Bind every `formatter_id` to the matching registry formatter. Returns
    /// the ids that were not registered; those columns keep default formatting.
    pub fn resolve_formatters(&mut self, registry: &FormatterRegistry) -> Vec<String> {
        let mut missing = Vec::new();
        for column in &mut self.columns {
            let Some(id) = &column.formatter_id else {
                continue;
            };
            match registry.get(id) {
                Some(formatter) => column.strategy.formatter = Some(formatter),
                None => missing.push(id.clone()),
            }
        }
        missing
    }
}

/// Pick the narrowest type every present value in `key` coerces to:
/// number, then date, then boolean, otherwise text.
pub fn infer_column_type(rows: &[Row], key: &str) -> ColumnType {
    let values: Vec<&CellValue> = rows
        .iter()
        .map(|r| r.get(key))
        .filter(|v| !v.is_null())
        .collect();
    if values.is_empty() {
        return ColumnType::Text;
    }
    let all = |kind: ColumnType| values.iter().all(|v| !v.coerce(Some(kind)).is_null());
    if values.iter().all(|v| matches!(v, CellValue::Bool(_))) {
        ColumnType::Boolean
    } else if all(ColumnType::Number) && !values.iter().any(|v| matches!(v, CellValue::Date(_))) {
        ColumnType::Number
    } else if all(ColumnType::Date)
        && values
            .iter()
            .all(|v| !matches!(v, CellValue::Number(_) | CellValue::Bool(_)))
    {
        ColumnType::Date
    } else if values
        .iter()
        .all(|v| matches!(v, CellValue::Text(s) if is_bool_word(s)))
    {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn is_bool_word(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "false" | "yes" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Row> {
        vec![
            Row::new(1)
                .with("name", "Ada")
                .with("age", "36")
                .with("joined", "2021-04-01")
                .with("admin", "true"),
            Row::new(2)
                .with("name", "Grace")
                .with("age", "")
                .with("joined", "2019-11-30")
                .with("admin", "no"),
            Row::new(3).with("name", "Linus").with("age", CellValue::Null),
        ]
    }

    #[test]
    fn test_infer_column_types() {
        let rows = rows();
        assert_eq!(infer_column_type(&rows, "name"), ColumnType::Text);
        assert_eq!(infer_column_type(&rows, "joined"), ColumnType::Date);
        assert_eq!(infer_column_type(&rows, "admin"), ColumnType::Boolean);
        assert_eq!(infer_column_type(&rows, "missing"), ColumnType::Text);
    }

    #[test]
    fn test_infer_number_ignores_blank_text() {
        // "" is text that does not coerce, so the column stays text
        let rows = rows();
        assert_eq!(infer_column_type(&rows, "age"), ColumnType::Text);
        let rows = vec![Row::new(1).with("n", "1"), Row::new(2).with("n", 2.5)];
        assert_eq!(infer_column_type(&rows, "n"), ColumnType::Number);
    }

    #[test]
    fn test_column_set_infer_keeps_first_seen_order() {
        let set = ColumnSet::infer(&rows());
        let keys: Vec<&str> = set.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["admin", "age", "joined", "name"]);
    }

    #[test]
    fn test_duplicate_keys_first_wins() {
        let set = ColumnSet::new(vec![
            ColumnDef::new("a", "First"),
            ColumnDef::new("a", "Second"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("a").unwrap().label, "First");
    }

    #[test]
    fn test_visible_columns_by_priority() {
        let set = ColumnSet::new(vec![
            ColumnDef::new("id", "Id").with_priority(3),
            ColumnDef::new("name", "Name").with_priority(1),
            ColumnDef::new("email", "Email").with_priority(2),
            ColumnDef::new("notes", "Notes").with_priority(5),
        ]);
        let keys: Vec<&str> = set.visible_columns(2).iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["name", "email"]);
        assert_eq!(set.visible_columns(10).len(), 4);
        assert!(set.visible_columns(0).is_empty());
    }

    #[test]
    fn test_resolve_formatters() {
        let registry = FormatterRegistry::with_builtins();
        let mut set = ColumnSet::new(vec![
            ColumnDef::new("name", "Name").with_formatter_id("uppercase"),
            ColumnDef::new("x", "X").with_formatter_id("nope"),
        ]);
        let missing = set.resolve_formatters(&registry);
        assert_eq!(missing, vec!["nope".to_string()]);
        let row = Row::new(1).with("name", "ada");
        let name = set.get("name").unwrap().clone();
        assert_eq!(set.display_string(&row, &name), "ADA");
    }
}
