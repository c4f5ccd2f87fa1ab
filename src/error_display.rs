//! User-facing error message formatting.
//!
//! Matches on typed errors (FilterError and SourceError variants, io::ErrorKind)
//! rather than parsing strings.

use std::io;
use std::path::Path;

use crate::filter::FilterError;
use crate::source::SourceError;

/// Format a FilterError with a hint on how to fix the expression.
pub fn user_message_from_filter(err: &FilterError) -> String {
    match err {
        FilterError::UnknownColumn(column) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            column
        ),
        FilterError::NotFilterable(column) => {
            format!("Column {} cannot be filtered.", column)
        }
        FilterError::IncompatibleOperator {
            column,
            operator,
            kind,
        } => format!(
            "Cannot use '{}' on {} column {}. Use it on number, currency or date columns.",
            operator, kind, column
        ),
        FilterError::MissingUpperBound(column) => format!(
            "Range filter on {} needs two values, e.g. {}=10..20",
            column, column
        ),
        FilterError::InvalidOperand {
            column,
            value,
            kind,
        } => format!("'{}' is not a valid {} for column {}.", value, kind, column),
        FilterError::InvalidExpression(expr) => format!(
            "Could not read filter '{}'. Expected col=v, col~v, col^v, col$v, col>v, col<v or col=a..b",
            expr
        ),
    }
}

/// Format a SourceError, falling back to the io message for file errors.
pub fn user_message_from_source(err: &SourceError) -> String {
    match err {
        SourceError::Open { source, .. } | SourceError::Io(source) => {
            user_message_from_io(source, None)
        }
        SourceError::UnknownFormat(_) => {
            "Unknown file format. Use --format to choose csv, tsv, psv, json or jsonl.".to_string()
        }
        SourceError::Csv(e) => match e.position() {
            Some(pos) => format!("Malformed delimited data at line {}.", pos.line()),
            None => format!("Malformed delimited data: {}", e),
        },
        SourceError::Json { line, .. } => format!("Malformed JSON at line {}.", line),
        SourceError::NotAnArray => "Expected a JSON array of objects.".to_string(),
        SourceError::NotAnObject(record) => format!("Record {} is not a JSON object.", record),
        SourceError::MissingId { record, column } => format!(
            "Record {} has no value in id column {}. Use --id-column to pick another column.",
            record, column
        ),
        SourceError::DuplicateId(id) => format!(
            "Row id {} appears more than once. Use --id-column to pick a unique column.",
            id
        ),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::Interrupted => "Operation interrupted.".to_string(),
        ErrorKind::OutOfMemory => "Out of memory.".to_string(),
        ErrorKind::Other => {
            let msg = err.to_string();
            if msg.contains("Is a directory") {
                return "Path is a directory, not a file.".to_string();
            }
            return if context.is_some() {
                format!("I/O error: {}", msg)
            } else {
                msg
            };
        }
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types.
/// Walks the cause chain to find a FilterError, SourceError or io::Error.
pub fn user_message_from_report(report: &color_eyre::eyre::Report, path: Option<&Path>) -> String {
    let with_path = |msg: String| match path {
        Some(p) => format!("Failed to load {}: {}", p.display(), msg),
        None => msg,
    };

    for cause in report.chain() {
        if let Some(fe) = cause.downcast_ref::<FilterError>() {
            return user_message_from_filter(fe);
        }
        if let Some(se) = cause.downcast_ref::<SourceError>() {
            return with_path(user_message_from_source(se));
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return with_path(user_message_from_io(io_err, None));
        }
    }

    // First line only, to avoid long tracebacks
    let display = report.to_string();
    let first_line = display.lines().next().unwrap_or("An error occurred");
    with_path(first_line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ColumnType;
    use crate::filter::FilterOperator;
    use color_eyre::eyre::eyre;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_from_io_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied");
        let msg = user_message_from_io(&err, Some("(config.toml)"));
        assert!(msg.to_lowercase().contains("permission"), "got: {}", msg);
        assert!(msg.ends_with("(config.toml)"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_filter() {
        let msg = user_message_from_filter(&FilterError::IncompatibleOperator {
            column: "name".to_string(),
            operator: FilterOperator::GreaterThan,
            kind: "text".to_string(),
        });
        assert!(msg.contains("greater than"), "got: {}", msg);
        assert!(msg.contains("name"), "got: {}", msg);

        let msg = user_message_from_filter(&FilterError::InvalidOperand {
            column: "age".to_string(),
            value: "old".to_string(),
            kind: ColumnType::Number,
        });
        assert_eq!(msg, "'old' is not a valid number for column age.");
    }

    #[test]
    fn test_user_message_from_report_finds_source_error() {
        let report = color_eyre::eyre::Report::new(SourceError::NotAnArray);
        let msg = user_message_from_report(&report, Some(Path::new("rows.json")));
        assert_eq!(
            msg,
            "Failed to load rows.json: Expected a JSON array of objects."
        );
    }

    #[test]
    fn test_user_message_from_report_fallback_first_line() {
        let report = eyre!("first line\nsecond line");
        assert_eq!(user_message_from_report(&report, None), "first line");
    }
}
