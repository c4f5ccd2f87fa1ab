use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::cell::{compare_present, nulls_last, CellValue, Collation};
use crate::column::ColumnSet;
use crate::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    fn apply(&self, a: &CellValue, b: &CellValue, collation: Collation) -> Ordering {
        match self {
            SortDirection::Ascending => compare_present(a, b, collation),
            SortDirection::Descending => compare_present(b, a, collation),
        }
    }
}

/// The single active (column, direction) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Header-click transition. The same column cycles
    /// ascending → descending → unsorted; another column starts at ascending.
    pub fn toggle(current: Option<&SortSpec>, column: &str) -> Option<SortSpec> {
        match current {
            Some(spec) if spec.column == column => match spec.direction {
                SortDirection::Ascending => Some(SortSpec::descending(column)),
                SortDirection::Descending => None,
            },
            _ => Some(SortSpec::ascending(column)),
        }
    }
}

/// Stable sort of `rows` by one column.
///
/// Absent values stay at the end in both directions. A spec naming an unknown
/// or non-sortable column leaves the order unchanged.
pub fn sort<'a>(rows: Vec<&'a Row>, spec: Option<&SortSpec>, columns: &ColumnSet) -> Vec<&'a Row> {
    let Some(spec) = spec else {
        return rows;
    };
    let Some(column) = columns.get(&spec.column).filter(|c| c.sortable) else {
        tracing::debug!(column = %spec.column, "sort column missing or not sortable; keeping order");
        return rows;
    };
    let collation = if column.case_sensitive {
        Collation::CaseSensitive
    } else {
        Collation::CaseInsensitive
    };
    let direction = spec.direction;
    let key = column.key.as_str();

    if let Some(comparator) = &column.strategy.comparator {
        let mut rows = rows;
        rows.sort_by(|a, b| {
            let (x, y) = (a.get(key), b.get(key));
            nulls_last(x, y).unwrap_or_else(|| match direction {
                SortDirection::Ascending => comparator(x, y),
                SortDirection::Descending => comparator(y, x),
            })
        });
        return rows;
    }

    // Coerce once per row rather than once per comparison.
    let mut keyed: Vec<_> = rows
        .into_iter()
        .map(|row| (row.get(key).coerce(column.kind), row))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        nulls_last(a, b).unwrap_or_else(|| direction.apply(a, b, collation))
    });
    keyed.into_iter().map(|(_, row)| row).collect()
}
