//! Cell value model shared by the search, filter and sort stages.
//!
//! A cell holds one of a closed set of scalar variants. Comparison and display
//! both go through the column's semantic type: values are coerced to that type
//! first, and anything that cannot be coerced is treated as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt::{self, Write};

use crate::column::ColumnDef;

/// A single table cell value.
///
/// Serialized untagged so saved views read naturally (`"Eng"`, `42`, `true`, `null`).
/// Dates serialize as ISO-8601 datetime strings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Boolean,
    Currency,
    Custom,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Currency => "currency",
            ColumnType::Custom => "custom",
        }
    }

    /// Number, currency and date columns support ordering filters.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            ColumnType::Number | ColumnType::Currency | ColumnType::Date
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How text values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collation {
    #[default]
    CaseSensitive,
    CaseInsensitive,
}

impl Collation {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::CaseSensitive => a.cmp(b),
            Collation::CaseInsensitive => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }
}

/// Formatting tokens used when rendering cells as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub currency_symbol: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
    /// strftime-style format for date cells
    pub date_format: String,
    pub true_label: String,
    pub false_label: String,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            thousands_separator: ",".to_string(),
            decimal_separator: ".".to_string(),
            date_format: "%m/%d/%Y".to_string(),
            true_label: "Yes".to_string(),
            false_label: "No".to_string(),
        }
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Coerce to the given column type. Values that cannot be represented in
    /// that type become `Null`. Untyped and custom columns keep the value as is.
    pub fn coerce(&self, kind: Option<ColumnType>) -> Cow<'_, CellValue> {
        let Some(kind) = kind else {
            return Cow::Borrowed(self);
        };
        match kind {
            ColumnType::Custom => Cow::Borrowed(self),
            ColumnType::Number | ColumnType::Currency => match self {
                CellValue::Number(n) if n.is_finite() => Cow::Borrowed(self),
                CellValue::Number(_) => Cow::Owned(CellValue::Null),
                other => Cow::Owned(other.as_number().map_or(CellValue::Null, CellValue::Number)),
            },
            ColumnType::Date => match self {
                CellValue::Date(_) => Cow::Borrowed(self),
                other => Cow::Owned(other.as_date().map_or(CellValue::Null, CellValue::Date)),
            },
            ColumnType::Boolean => match self {
                CellValue::Bool(_) => Cow::Borrowed(self),
                other => Cow::Owned(other.as_bool().map_or(CellValue::Null, CellValue::Bool)),
            },
            ColumnType::Text => match self {
                CellValue::Text(_) | CellValue::Null => Cow::Borrowed(self),
                other => Cow::Owned(CellValue::Text(other.raw_string())),
            },
        }
    }

    /// Best-effort numeric reading. Accepts grouping separators and a leading
    /// currency symbol in text; dates read as epoch milliseconds.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Date(d) => Some(d.and_utc().timestamp_millis() as f64),
            CellValue::Text(s) => parse_number(s),
            CellValue::Null => None,
        }
    }

    /// Best-effort date reading. Numbers are epoch milliseconds.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => parse_date(s),
            CellValue::Number(n) if n.is_finite() => {
                DateTime::from_timestamp_millis(*n as i64).map(|d| d.naive_utc())
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) if *n == 0.0 => Some(false),
            CellValue::Number(n) if *n == 1.0 => Some(true),
            CellValue::Text(s) => parse_bool(s),
            _ => None,
        }
    }

    /// Literal string form, independent of any column formatting.
    pub fn raw_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(d) => format_iso(d),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_string())
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Compare two cells under a column type, case-sensitively.
///
/// Absent values (including values that fail coercion) order after every
/// present value.
pub fn compare(a: &CellValue, b: &CellValue, kind: Option<ColumnType>) -> Ordering {
    compare_with(a, b, kind, Collation::CaseSensitive)
}

pub fn compare_with(
    a: &CellValue,
    b: &CellValue,
    kind: Option<ColumnType>,
    collation: Collation,
) -> Ordering {
    let a = a.coerce(kind);
    let b = b.coerce(kind);
    nulls_last(&a, &b).unwrap_or_else(|| compare_present(&a, &b, collation))
}

/// Ordering decided by absence alone, or None when both values are present.
/// Non-finite numbers count as absent.
pub(crate) fn nulls_last(a: &CellValue, b: &CellValue) -> Option<Ordering> {
    match (is_absent(a), is_absent(b)) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Greater),
        (false, true) => Some(Ordering::Less),
        (false, false) => None,
    }
}

fn is_absent(value: &CellValue) -> bool {
    match value {
        CellValue::Null => true,
        CellValue::Number(n) => !n.is_finite(),
        _ => false,
    }
}

/// Variant order used when an untyped column mixes kinds of values.
fn variant_rank(value: &CellValue) -> u8 {
    match value {
        CellValue::Bool(_) => 0,
        CellValue::Number(_) => 1,
        CellValue::Date(_) => 2,
        CellValue::Text(_) => 3,
        CellValue::Null => 4,
    }
}

/// Compare two present, already coerced values. Mixed variants order by
/// kind: booleans, numbers, dates, then text.
pub(crate) fn compare_present(a: &CellValue, b: &CellValue, collation: Collation) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Date(x), CellValue::Date(y)) => x.cmp(y),
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        (CellValue::Text(x), CellValue::Text(y)) => collation.compare(x, y),
        (x, y) => variant_rank(x).cmp(&variant_rank(y)),
    }
}

/// Render a cell for display under its column definition.
///
/// A custom formatter on the column always wins. Otherwise the column type
/// picks the format; values that do not fit the type render literally.
pub fn to_display_string(value: &CellValue, column: &ColumnDef, options: &DisplayOptions) -> String {
    if let Some(formatter) = &column.strategy.formatter {
        return formatter(value);
    }
    if value.is_null() {
        return String::new();
    }
    match column.kind {
        Some(ColumnType::Currency) => match value.as_number() {
            Some(n) => format_currency(n, options),
            None => value.raw_string(),
        },
        Some(ColumnType::Date) => match value.as_date() {
            Some(d) => format_date(&d, options),
            None => value.raw_string(),
        },
        Some(ColumnType::Number) => match value.as_number() {
            Some(n) => format_number(n),
            None => value.raw_string(),
        },
        Some(ColumnType::Boolean) => match value.as_bool() {
            Some(b) => bool_label(b, options).to_string(),
            None => value.raw_string(),
        },
        Some(ColumnType::Text) | Some(ColumnType::Custom) | None => default_display(value, options),
    }
}

fn default_display(value: &CellValue, options: &DisplayOptions) -> String {
    match value {
        CellValue::Bool(b) => bool_label(*b, options).to_string(),
        CellValue::Date(d) => format_date(d, options),
        other => other.raw_string(),
    }
}

fn bool_label(value: bool, options: &DisplayOptions) -> &str {
    if value {
        &options.true_label
    } else {
        &options.false_label
    }
}

/// Integral values print without a fractional part; everything else uses the
/// shortest representation that round-trips.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Monetary format: symbol, grouped whole part, two decimals (`-$1,234.50`).
pub fn format_currency(n: f64, options: &DisplayOptions) -> String {
    let cents = (n.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as u64;
    let frac = (cents % 100.0) as u64;
    let sign = if n < 0.0 && cents > 0.0 { "-" } else { "" };
    format!(
        "{}{}{}{}{:02}",
        sign,
        options.currency_symbol,
        group_thousands(whole, &options.thousands_separator),
        options.decimal_separator,
        frac
    )
}

pub fn group_thousands(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

/// Format with the configured pattern. An unusable pattern falls back to ISO.
pub fn format_date(d: &NaiveDateTime, options: &DisplayOptions) -> String {
    let mut out = String::new();
    if write!(out, "{}", d.format(&options.date_format)).is_err() {
        return d.date().format("%Y-%m-%d").to_string();
    }
    out
}

fn format_iso(d: &NaiveDateTime) -> String {
    if d.time() == chrono::NaiveTime::MIN {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, trimmed),
    };
    let unsigned = unsigned.trim_start_matches(['$', '€', '£', '¥']);
    let cleaned: String = unsigned.chars().filter(|c| *c != ',' && *c != '_').collect();
    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(if negative { -n } else { n })
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse ISO dates, ISO datetimes (with or without offset) and US-style dates.
pub fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    None
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Returns an error message when a strftime pattern contains invalid items.
pub fn validate_date_format(format: &str) -> Result<(), String> {
    use chrono::format::{Item, StrftimeItems};
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid date format `{}`", format));
    }
    Ok(())
}
