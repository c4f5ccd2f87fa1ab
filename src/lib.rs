//! Search, filter, sort and paginate in-memory tabular data.
//!
//! The pipeline stages live in [`search`], [`filter`], [`sort`] and [`paginate`]
//! and are composed by [`pipeline::run`]. Every stage takes and returns
//! `Vec<&Row>`; rows are never modified.

pub mod cell;
pub mod column;
pub mod config;
pub mod error_display;
pub mod filter;
pub mod paginate;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod row;
pub mod search;
pub mod sort;
pub mod source;
pub mod view;

pub use cell::{compare, to_display_string, CellValue, ColumnType, DisplayOptions};
pub use column::{ColumnDef, ColumnSet, ColumnStrategy};
pub use config::{AppConfig, ConfigManager};
pub use filter::{filter, FilterError, FilterOperator, FilterSet, FilterSpec};
pub use paginate::{paginate, total_pages};
pub use pipeline::{run, PipelineRequest, PipelineResult, TableState};
pub use registry::{FormatterRegistry, Registration, Registry};
pub use row::{Row, RowId};
pub use search::search;
pub use sort::{sort, SortDirection, SortSpec};
pub use source::{load, LoadOptions, SourceError, Table};
pub use view::{View, ViewManager, ViewSettings};

/// Re-export CLI definitions shared with the build script
pub use tabula_cli::{Args, CompressionFormat, FileFormat};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "tabula";
