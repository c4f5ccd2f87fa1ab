use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cell::CellValue;

static NULL: CellValue = CellValue::Null;

/// Unique row identifier used for selection and stable keying.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(n) => write!(f, "{}", n),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Int(value)
    }
}

impl From<i32> for RowId {
    fn from(value: i32) -> Self {
        RowId::Int(i64::from(value))
    }
}

impl From<usize> for RowId {
    fn from(value: usize) -> Self {
        RowId::Int(value as i64)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

impl From<String> for RowId {
    fn from(value: String) -> Self {
        RowId::Text(value)
    }
}

/// One record: an id plus cells keyed by column key.
///
/// Rows are never modified by the pipeline; stages pass `&Row` around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub cells: BTreeMap<String, CellValue>,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.cells.insert(key.into(), value.into());
        self
    }

    /// Cell for `key`; a missing key reads as `Null`.
    pub fn get(&self, key: &str) -> &CellValue {
        self.cells.get(key).unwrap_or(&NULL)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }
}
