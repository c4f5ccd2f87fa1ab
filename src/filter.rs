use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::cell::{compare, CellValue, ColumnType};
use crate::column::{ColumnDef, ColumnSet};
use crate::row::Row;

#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Between,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "equals",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "starts with",
            FilterOperator::EndsWith => "ends with",
            FilterOperator::GreaterThan => "greater than",
            FilterOperator::LessThan => "less than",
            FilterOperator::Between => "between",
        }
    }

    pub fn iterator() -> impl Iterator<Item = FilterOperator> {
        [
            FilterOperator::Equals,
            FilterOperator::Contains,
            FilterOperator::StartsWith,
            FilterOperator::EndsWith,
            FilterOperator::GreaterThan,
            FilterOperator::LessThan,
            FilterOperator::Between,
        ]
        .iter()
        .copied()
    }

    /// Operators that need an ordered (number, currency or date) column.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            FilterOperator::GreaterThan | FilterOperator::LessThan | FilterOperator::Between
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("column `{0}` is not filterable")]
    NotFilterable(String),
    #[error("`{operator}` is not supported on {kind} column `{column}`")]
    IncompatibleOperator {
        column: String,
        operator: FilterOperator,
        kind: String,
    },
    #[error("`between` on column `{0}` needs a second value")]
    MissingUpperBound(String),
    #[error("`{value}` is not a valid {kind} value for column `{column}`")]
    InvalidOperand {
        column: String,
        value: String,
        kind: ColumnType,
    },
    #[error("invalid filter expression `{0}`")]
    InvalidExpression(String),
}

static FILTER_EXPR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<col>[^=~\^\$<>]+?)\s*(?P<op>[=~\^\$<>])\s*(?P<val>.*?)\s*$")
        .expect("valid regex")
});

/// One (column, operator, value) predicate as configured by a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column: String,
    pub operator: FilterOperator,
    pub value: CellValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<CellValue>,
}

impl FilterSpec {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<CellValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<CellValue>,
        high: impl Into<CellValue>,
    ) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::Between,
            value: low.into(),
            value2: Some(high.into()),
        }
    }

    /// Matches cells that are absent (or not readable as the column type).
    pub fn is_empty(column: impl Into<String>) -> Self {
        Self::new(column, FilterOperator::Equals, CellValue::Null)
    }

    /// Parse a compact expression such as `salary>100`, `name~ali` or `age=20..30`.
    ///
    /// | form | operator |
    /// |------|----------|
    /// | `col=v` | equals (`col=` matches empty cells) |
    /// | `col=a..b` | between |
    /// | `col~v` | contains |
    /// | `col^v` | starts with |
    /// | `col$v` | ends with |
    /// | `col>v`, `col<v` | greater / less than |
    ///
    /// Values are kept as text; validation coerces them to the column type.
    pub fn parse(expr: &str) -> Result<Self, FilterError> {
        let invalid = || FilterError::InvalidExpression(expr.to_string());
        let caps = FILTER_EXPR_REGEX.captures(expr).ok_or_else(invalid)?;
        let column = caps["col"].to_string();
        let value = &caps["val"];

        let spec = match &caps["op"] {
            "=" if value.is_empty() => Self::is_empty(column),
            "=" => match value.split_once("..") {
                Some((low, high)) if !low.trim().is_empty() && !high.trim().is_empty() => {
                    Self::between(column, low.trim(), high.trim())
                }
                Some(_) => return Err(invalid()),
                None => Self::new(column, FilterOperator::Equals, value),
            },
            _ if value.is_empty() => return Err(invalid()),
            "~" => Self::new(column, FilterOperator::Contains, value),
            "^" => Self::new(column, FilterOperator::StartsWith, value),
            "$" => Self::new(column, FilterOperator::EndsWith, value),
            ">" => Self::new(column, FilterOperator::GreaterThan, value),
            "<" => Self::new(column, FilterOperator::LessThan, value),
            _ => return Err(invalid()),
        };
        Ok(spec)
    }
}

/// A filter spec checked against its column, with operands already coerced.
#[derive(Debug, Clone)]
struct CompiledFilter {
    spec: FilterSpec,
    kind: Option<ColumnType>,
    value: CellValue,
    value2: Option<CellValue>,
    needle: String,
}

impl CompiledFilter {
    fn compile(spec: FilterSpec, columns: &ColumnSet) -> Result<Self, FilterError> {
        let column = columns
            .get(&spec.column)
            .ok_or_else(|| FilterError::UnknownColumn(spec.column.clone()))?;
        if !column.filterable {
            return Err(FilterError::NotFilterable(spec.column.clone()));
        }
        let kind = column.kind;

        if spec.operator.is_ordering() && !kind.is_some_and(|k| k.is_ordered()) {
            return Err(FilterError::IncompatibleOperator {
                column: spec.column.clone(),
                operator: spec.operator,
                kind: kind.map_or("untyped", |k| k.as_str()).to_string(),
            });
        }

        let coerce = |raw: &CellValue| -> Result<CellValue, FilterError> {
            let coerced = raw.coerce(kind).into_owned();
            if coerced.is_null() {
                Err(FilterError::InvalidOperand {
                    column: spec.column.clone(),
                    value: raw.raw_string(),
                    kind: kind.unwrap_or(ColumnType::Text),
                })
            } else {
                Ok(coerced)
            }
        };

        let (value, value2) = match spec.operator {
            FilterOperator::Equals if spec.value.is_null() => (CellValue::Null, None),
            FilterOperator::Equals | FilterOperator::GreaterThan | FilterOperator::LessThan => {
                (coerce(&spec.value)?, None)
            }
            FilterOperator::Between => {
                let high = spec
                    .value2
                    .as_ref()
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| FilterError::MissingUpperBound(spec.column.clone()))?;
                (coerce(&spec.value)?, Some(coerce(high)?))
            }
            FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
                (spec.value.clone(), None)
            }
        };
        let needle = spec.value.raw_string().to_lowercase();

        Ok(Self {
            spec,
            kind,
            value,
            value2,
            needle,
        })
    }

    fn matches(&self, row: &Row, column: &ColumnDef, columns: &ColumnSet) -> bool {
        let raw = row.get(&column.key);
        let cell = raw.coerce(self.kind);
        if cell.is_null() {
            return self.spec.operator == FilterOperator::Equals && self.value.is_null();
        }
        match self.spec.operator {
            FilterOperator::Equals => {
                !self.value.is_null() && compare(&cell, &self.value, self.kind) == Ordering::Equal
            }
            FilterOperator::Contains => self.display_lower(row, column, columns).contains(&self.needle),
            FilterOperator::StartsWith => {
                self.display_lower(row, column, columns).starts_with(&self.needle)
            }
            FilterOperator::EndsWith => self.display_lower(row, column, columns).ends_with(&self.needle),
            FilterOperator::GreaterThan => {
                compare(&cell, &self.value, self.kind) == Ordering::Greater
            }
            FilterOperator::LessThan => compare(&cell, &self.value, self.kind) == Ordering::Less,
            FilterOperator::Between => match &self.value2 {
                Some(high) => {
                    compare(&cell, &self.value, self.kind) != Ordering::Less
                        && compare(&cell, high, self.kind) != Ordering::Greater
                }
                None => false,
            },
        }
    }

    fn display_lower(&self, row: &Row, column: &ColumnDef, columns: &ColumnSet) -> String {
        columns.display_string(row, column).to_lowercase()
    }
}

/// Validated filter specs, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<CompiledFilter>,
}

impl FilterSet {
    /// Validate every spec against `columns`. The first invalid spec is reported.
    pub fn new(specs: Vec<FilterSpec>, columns: &ColumnSet) -> Result<Self, FilterError> {
        let filters = specs
            .into_iter()
            .map(|spec| CompiledFilter::compile(spec, columns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, spec: FilterSpec, columns: &ColumnSet) -> Result<(), FilterError> {
        self.filters.push(CompiledFilter::compile(spec, columns)?);
        Ok(())
    }

    /// Remove the filter at `index`, returning its spec.
    pub fn remove(&mut self, index: usize) -> Option<FilterSpec> {
        (index < self.filters.len()).then(|| self.filters.remove(index).spec)
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn specs(&self) -> impl Iterator<Item = &FilterSpec> {
        self.filters.iter().map(|f| &f.spec)
    }
}

/// Keep rows that satisfy every filter in `filters`. Input order is preserved.
pub fn filter<'a>(rows: Vec<&'a Row>, filters: &FilterSet, columns: &ColumnSet) -> Vec<&'a Row> {
    if filters.is_empty() {
        return rows;
    }
    // Columns were checked at validation; resolve them once.
    let bound: Vec<(&CompiledFilter, &ColumnDef)> = filters
        .filters
        .iter()
        .filter_map(|f| columns.get(&f.spec.column).map(|c| (f, c)))
        .collect();
    if bound.len() != filters.len() {
        tracing::warn!("filters were validated against a different column set; no rows match");
        return Vec::new();
    }
    rows.into_iter()
        .filter(|row| bound.iter().all(|(f, c)| f.matches(row, c, columns)))
        .collect()
}
