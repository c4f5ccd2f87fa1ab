//! Loading rows from delimited text and JSON files.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::cell::CellValue;
use crate::column::ColumnSet;
use crate::row::{Row, RowId};
use crate::{CompressionFormat, FileFormat};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not detect the format of {}; pass --format", .0.display())]
    UnknownFormat(PathBuf),
    #[error("malformed delimited data: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected a JSON array of objects")]
    NotAnArray,
    #[error("record {0} is not a JSON object")]
    NotAnObject(usize),
    #[error("record {record} has no value in id column `{column}`")]
    MissingId { record: usize, column: String },
    #[error("duplicate row id `{0}`")]
    DuplicateId(RowId),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How to read a data file. Unset fields are detected from the path.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub format: Option<FileFormat>,
    pub compression: Option<CompressionFormat>,
    pub delimiter: Option<u8>,
    /// Column holding row ids. Defaults to `id` when present, otherwise the
    /// 1-based record number.
    pub id_column: Option<String>,
}

/// Rows plus the columns inferred from them, in file order.
#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Vec<Row>,
    pub columns: ColumnSet,
}

const DEFAULT_ID_COLUMN: &str = "id";

/// Open `path`, decompressing when needed, and read it as a table.
pub fn load(path: &Path, options: &LoadOptions) -> Result<Table, SourceError> {
    let format = options
        .format
        .or_else(|| FileFormat::from_path(path))
        .ok_or_else(|| SourceError::UnknownFormat(path.to_path_buf()))?;
    let compression = options
        .compression
        .or_else(|| CompressionFormat::from_extension(path));

    let reader = open(path, compression)?;
    tracing::debug!(path = %path.display(), ?format, ?compression, "loading table");
    read_table(reader, format, options)
}

fn open(path: &Path, compression: Option<CompressionFormat>) -> Result<Box<dyn Read>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let file = BufReader::new(file);
    let reader: Box<dyn Read> = match compression {
        None => Box::new(file),
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::GzDecoder::new(file)),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(file)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(file)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(file)),
    };
    Ok(reader)
}

/// Read an already-decompressed stream.
pub fn read_table<R: Read>(
    reader: R,
    format: FileFormat,
    options: &LoadOptions,
) -> Result<Table, SourceError> {
    let (keys, records) = match format {
        FileFormat::Json => read_json(reader)?,
        FileFormat::Jsonl => read_json_lines(reader)?,
        FileFormat::Csv | FileFormat::Tsv | FileFormat::Psv => {
            let delimiter = options.delimiter.or(format.delimiter()).unwrap_or(b',');
            read_delimited(reader, delimiter)?
        }
    };

    let id_column = match &options.id_column {
        Some(column) => Some(column.as_str()),
        None => keys
            .iter()
            .any(|k| k == DEFAULT_ID_COLUMN)
            .then_some(DEFAULT_ID_COLUMN),
    };
    let rows = assign_ids(records, id_column)?;
    let columns = ColumnSet::infer_ordered(&rows, &keys);
    tracing::debug!(rows = rows.len(), columns = columns.len(), "table loaded");
    Ok(Table { rows, columns })
}

type Record = Vec<(String, CellValue)>;

fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<(Vec<String>, Vec<Record>), SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let keys: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let name = name.trim();
            if name.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells = keys
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let value = match record.get(idx).map(str::trim) {
                    None | Some("") => CellValue::Null,
                    Some(text) => CellValue::from(text),
                };
                (key.clone(), value)
            })
            .collect();
        records.push(cells);
    }
    Ok((keys, records))
}

fn read_json<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Record>), SourceError> {
    let value: Value =
        serde_json::from_reader(reader).map_err(|source| SourceError::Json { line: source.line(), source })?;
    let Value::Array(items) = value else {
        return Err(SourceError::NotAnArray);
    };
    let mut keys = KeyOrder::default();
    let records = items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| object_record(item, idx + 1, &mut keys))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((keys.into_keys(), records))
}

fn read_json_lines<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Record>), SourceError> {
    let mut keys = KeyOrder::default();
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line).map_err(|source| SourceError::Json {
            line: idx + 1,
            source,
        })?;
        records.push(object_record(value, records.len() + 1, &mut keys)?);
    }
    Ok((keys.into_keys(), records))
}

fn object_record(value: Value, record: usize, keys: &mut KeyOrder) -> Result<Record, SourceError> {
    let Value::Object(map) = value else {
        return Err(SourceError::NotAnObject(record));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            keys.see(&key);
            (key, json_cell(value))
        })
        .collect())
}

fn json_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(b),
        Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        Value::String(s) if s.trim().is_empty() => CellValue::Null,
        Value::String(s) => CellValue::Text(s),
        nested @ (Value::Array(_) | Value::Object(_)) => CellValue::Text(nested.to_string()),
    }
}

/// Column keys in first-seen order.
#[derive(Default)]
struct KeyOrder {
    keys: Vec<String>,
    seen: BTreeSet<String>,
}

impl KeyOrder {
    fn see(&mut self, key: &str) {
        if self.seen.insert(key.to_string()) {
            self.keys.push(key.to_string());
        }
    }

    fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

fn assign_ids(records: Vec<Record>, id_column: Option<&str>) -> Result<Vec<Row>, SourceError> {
    let mut seen = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());
    for (idx, cells) in records.into_iter().enumerate() {
        let number = idx + 1;
        let id = match id_column {
            None => RowId::from(number),
            Some(column) => cells
                .iter()
                .find(|(key, _)| key == column)
                .and_then(|(_, value)| row_id(value))
                .ok_or_else(|| SourceError::MissingId {
                    record: number,
                    column: column.to_string(),
                })?,
        };
        if !seen.insert(id.clone()) {
            return Err(SourceError::DuplicateId(id));
        }
        let mut row = Row::new(id);
        row.cells.extend(cells);
        rows.push(row);
    }
    Ok(rows)
}

fn row_id(value: &CellValue) -> Option<RowId> {
    match value {
        CellValue::Null => None,
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Some(RowId::Int(*n as i64)),
        CellValue::Text(s) => Some(
            s.trim()
                .parse::<i64>()
                .map_or_else(|_| RowId::Text(s.trim().to_string()), RowId::Int),
        ),
        other => Some(RowId::Text(other.raw_string())),
    }
}
