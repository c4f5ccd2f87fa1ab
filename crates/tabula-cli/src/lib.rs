//! Shared CLI definitions for tabula.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// File format for data files (used to bypass extension-based detection).
/// When `--format` is not specified, format is auto-detected from the file extension.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Pipe-separated values
    Psv,
    /// JSON array of objects
    Json,
    /// JSON Lines / NDJSON (one JSON object per line)
    Jsonl,
}

impl FileFormat {
    /// Detect file format from path extension, looking through a compression suffix
    /// (`data.csv.gz` is Csv). Returns None when the extension is missing or unknown.
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = if CompressionFormat::from_extension(path).is_some() {
            Path::new(path.file_stem()?)
        } else {
            path
        };
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse format from extension string (e.g. "csv", "jsonl").
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "psv" => Some(Self::Psv),
            "json" => Some(Self::Json),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }

    /// Field delimiter for the delimited text formats.
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            Self::Csv => Some(b','),
            Self::Tsv => Some(b'\t'),
            Self::Psv => Some(b'|'),
            Self::Json | Self::Jsonl => None,
        }
    }
}

/// Compression format for data files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz) - Most common, good balance of speed and compression
    Gzip,
    /// Zstandard compression (.zst) - Modern, fast compression with good ratios
    Zstd,
    /// Bzip2 compression (.bz2) - Good compression ratio, slower than gzip
    Bzip2,
    /// XZ compression (.xz) - Excellent compression ratio, slower than bzip2
    Xz,
}

impl CompressionFormat {
    /// Detect compression format from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            match ext.to_lowercase().as_str() {
                "gz" => Some(Self::Gzip),
                "zst" | "zstd" => Some(Self::Zstd),
                "bz2" | "bz" => Some(Self::Bzip2),
                "xz" => Some(Self::Xz),
                _ => None,
            }
        } else {
            None
        }
    }

    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
            Self::Bzip2 => "bz2",
            Self::Xz => "xz",
        }
    }
}

/// Command-line arguments for tabula
#[derive(Clone, Parser, Debug)]
#[command(
    name = "tabula",
    version,
    about = "Search, filter, sort and paginate tabular data",
    long_about = "Loads rows from a CSV, TSV, PSV, JSON or JSON Lines file and prints one page of \
                  the result after applying a search, filters and a sort.\n\n\
                  Stages always run in the same order: search, filter, sort, paginate."
)]
pub struct Args {
    /// Path to the data file to open (not required with --generate-config, --list-views or --remove-views)
    #[arg(required_unless_present_any = ["generate_config", "list_views", "remove_views"], value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Case-insensitive text searched for in every column
    #[arg(short = 's', long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Filter expression. Repeat to combine filters with AND.
    /// Forms: col=v, col~v (contains), col^v (starts with), col$v (ends with), col>v, col<v, col=a..b (between), col= (is empty)
    #[arg(short = 'f', long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Column to sort by
    #[arg(long = "sort", value_name = "COL")]
    pub sort: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long = "desc", requires = "sort", action)]
    pub descending: bool,

    /// Page to display (1-based). Out of range values are clamped.
    #[arg(short = 'p', long = "page", value_name = "N", allow_negative_numbers = true)]
    pub page: Option<i64>,

    /// Rows per page (overrides config [pagination] page_size)
    #[arg(long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// Show at most this many columns, keeping the highest priority ones
    #[arg(long = "max-columns", value_name = "N")]
    pub max_columns: Option<usize>,

    /// Force file format (csv, tsv, psv, json, jsonl).
    /// By default format is auto-detected from the file extension.
    #[arg(long = "format", value_enum)]
    pub format: Option<FileFormat>,

    /// Specify the compression format explicitly (gzip, zstd, bzip2, xz)
    /// If not specified, compression is auto-detected from file extension.
    #[arg(long = "compression", value_enum)]
    pub compression: Option<CompressionFormat>,

    /// Specify the delimiter to use when reading a delimited text file
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Column holding the row id. Defaults to "id" when present, otherwise the row number.
    #[arg(long = "id-column", value_name = "COL")]
    pub id_column: Option<String>,

    /// Apply a saved view by name
    #[arg(long = "view", value_name = "NAME")]
    pub view: Option<String>,

    /// Save the search, filters, sort and page size of this run as a view
    #[arg(long = "save-view", value_name = "NAME")]
    pub save_view: Option<String>,

    /// List saved views and exit
    #[arg(long = "list-views", action)]
    pub list_views: bool,

    /// Remove all saved views and exit
    #[arg(long = "remove-views", action)]
    pub remove_views: bool,

    /// Generate default configuration file at ~/.config/tabula/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn value_placeholder(arg: &clap::Arg) -> String {
    arg.get_value_names()
        .map(|names| {
            names
                .iter()
                .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Render command-line options as markdown.
///
/// Used by the gen_docs binary; output is written to stdout.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let option_str = if arg.is_positional() {
            let placeholder = value_placeholder(arg);
            if arg.is_required_set() {
                placeholder
            } else {
                format!("[{placeholder}]")
            }
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            let placeholder = if arg.get_action().takes_values() {
                value_placeholder(arg)
            } else {
                String::new()
            };
            if placeholder.is_empty() {
                op
            } else {
                format!("{op} {placeholder}")
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_detection() {
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.gz")),
            Some(CompressionFormat::Gzip)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.zst")),
            Some(CompressionFormat::Zstd)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.json.bz2")),
            Some(CompressionFormat::Bzip2)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv.xz")),
            Some(CompressionFormat::Xz)
        );
        assert_eq!(
            CompressionFormat::from_extension(Path::new("file.csv")),
            None
        );
        assert_eq!(CompressionFormat::from_extension(Path::new("file")), None);
    }

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(
            FileFormat::from_path(Path::new("data.csv")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("file.jsonl")),
            Some(FileFormat::Jsonl)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("file.NDJSON")),
            Some(FileFormat::Jsonl)
        );
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
        assert_eq!(FileFormat::from_path(Path::new("data.parquet")), None);
    }

    #[test]
    fn test_file_format_through_compression_suffix() {
        assert_eq!(
            FileFormat::from_path(Path::new("people.csv.gz")),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            FileFormat::from_path(Path::new("events.jsonl.zst")),
            Some(FileFormat::Jsonl)
        );
        assert_eq!(FileFormat::from_path(Path::new("blob.gz")), None);
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(FileFormat::Csv.delimiter(), Some(b','));
        assert_eq!(FileFormat::Tsv.delimiter(), Some(b'\t'));
        assert_eq!(FileFormat::Psv.delimiter(), Some(b'|'));
        assert_eq!(FileFormat::Json.delimiter(), None);
    }

    #[test]
    fn test_args_parse_filters_and_negative_page() {
        let args = Args::parse_from([
            "tabula",
            "data.csv",
            "--filter",
            "department=Eng",
            "-f",
            "salary>100",
            "--sort",
            "salary",
            "--desc",
            "--page",
            "-3",
        ]);
        assert_eq!(args.path, Some(PathBuf::from("data.csv")));
        assert_eq!(args.filters, vec!["department=Eng", "salary>100"]);
        assert_eq!(args.sort.as_deref(), Some("salary"));
        assert!(args.descending);
        assert_eq!(args.page, Some(-3));
    }

    #[test]
    fn test_path_optional_with_generate_config() {
        let args = Args::parse_from(["tabula", "--generate-config"]);
        assert!(args.path.is_none());
        assert!(Args::try_parse_from(["tabula"]).is_err());
    }

    #[test]
    fn test_render_options_markdown() {
        let md = render_options_markdown();
        assert!(md.starts_with("# Command Line Options"));
        assert!(md.contains("`-f, --filter <EXPR>`"));
        assert!(md.contains("`--desc`"));
        assert!(!md.contains("`--help`"));
    }
}
