use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cell::{validate_date_format, ColumnType, DisplayOptions};
use crate::column::{ColumnDef, ColumnSet};

/// Manages config directory and config file operations
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file or subdirectory
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Ensure a subdirectory exists within the config directory
    pub fn ensure_subdir(&self, subdir: &str) -> Result<PathBuf> {
        let subdir_path = self.config_dir.join(subdir);
        if !subdir_path.exists() {
            std::fs::create_dir_all(&subdir_path)?;
        }
        Ok(subdir_path)
    }

    /// Generate the default configuration as TOML.
    /// Every field is commented out so defaults apply until the user uncomments one.
    pub fn generate_default_config(&self) -> Result<String> {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;

        let comments = Self::collect_all_comments();
        let mut result = Self::comment_all_fields(toml_str, comments);
        result.push_str(COLUMNS_EXAMPLE);
        Ok(result)
    }

    /// Collect all field comments from the section constants into a map keyed by field path
    fn collect_all_comments() -> HashMap<String, String> {
        let mut comments = HashMap::new();

        for (field, comment) in APP_COMMENTS {
            comments.insert(field.to_string(), comment.to_string());
        }
        for (field, comment) in DISPLAY_COMMENTS {
            comments.insert(format!("display.{}", field), comment.to_string());
        }
        for (field, comment) in PAGINATION_COMMENTS {
            comments.insert(format!("pagination.{}", field), comment.to_string());
        }
        for (field, comment) in SORT_COMMENTS {
            comments.insert(format!("sort.{}", field), comment.to_string());
        }
        for (field, comment) in LOGGING_COMMENTS {
            comments.insert(format!("logging.{}", field), comment.to_string());
        }

        comments
    }

    /// Comment out all fields in TOML and add comments.
    /// Option fields that serialize to nothing are added back as `# field = null`.
    fn comment_all_fields(toml: String, comments: HashMap<String, String>) -> String {
        let mut result = String::new();
        result.push_str("# tabula configuration file\n");
        result
            .push_str("# This file uses TOML format. See https://toml.io/ for syntax reference.\n");
        result.push('\n');

        let mut current_section = String::new();
        let mut seen_fields: HashSet<String> = HashSet::new();

        for line in toml.lines() {
            if let Some(section) = Self::extract_section_name(line) {
                if let Some(header) = SECTION_HEADERS.iter().find(|(s, _)| *s == section) {
                    result.push_str(header.1);
                    result.push('\n');
                }
                current_section = section;

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
                continue;
            }

            if let Some(field_path) = Self::extract_field_path_simple(line, &current_section) {
                if let Some(comment) = comments.get(&field_path) {
                    for comment_line in comment.lines() {
                        result.push_str("# ");
                        result.push_str(comment_line);
                        result.push('\n');
                    }
                }
                seen_fields.insert(field_path);

                result.push_str("# ");
                result.push_str(line);
                result.push('\n');
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Self::add_missing_option_fields(result, &comments, &seen_fields)
    }

    /// Add Option fields that were not serialized because they are None
    fn add_missing_option_fields(
        mut result: String,
        comments: &HashMap<String, String>,
        seen_fields: &HashSet<String>,
    ) -> String {
        let option_fields = ["display.max_columns"];

        for field_path in option_fields {
            if seen_fields.contains(field_path) || !comments.contains_key(field_path) {
                continue;
            }
            let Some((section, field_name)) = field_path.split_once('.') else {
                continue;
            };
            let section_header = format!("[{}]", section);
            let Some(section_pos) = result.find(&section_header) else {
                continue;
            };
            let after_header_start = section_pos + section_header.len();
            let newline_pos = result[after_header_start..].find('\n').unwrap_or(0);
            let insert_pos = after_header_start + newline_pos + 1;

            let mut new_content = String::new();
            if let Some(comment) = comments.get(field_path) {
                for comment_line in comment.lines() {
                    new_content.push_str("# ");
                    new_content.push_str(comment_line);
                    new_content.push('\n');
                }
            }
            new_content.push_str(&format!("# {} = null\n", field_name));

            result.insert_str(insert_pos, &new_content);
        }

        result
    }

    /// Extract section name from TOML line like "[display]"
    fn extract_section_name(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            Some(trimmed[1..trimmed.len() - 1].to_string())
        } else {
            None
        }
    }

    /// Extract the dotted field path of an assignment line
    fn extract_field_path_simple(line: &str, current_section: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let (field_name, _) = trimmed.split_once('=')?;
        let field_name = field_name.trim();
        if current_section.is_empty() {
            Some(field_name.to_string())
        } else {
            Some(format!("{}.{}", current_section, field_name))
        }
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;

        let template = self.generate_default_config()?;
        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub display: DisplayConfig,
    pub pagination: PaginationConfig,
    pub sort: SortConfig,
    pub logging: LoggingConfig,
    /// Per-column overrides keyed by column key
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, ColumnOverride>,
}

const APP_COMMENTS: &[(&str, &str)] = &[(
    "version",
    "Configuration format version (for future compatibility)",
)];

const SECTION_HEADERS: &[(&str, &str)] = &[
    (
        "display",
        "# ============================================================================\n# Display Settings\n# ============================================================================",
    ),
    (
        "pagination",
        "# ============================================================================\n# Pagination\n# ============================================================================",
    ),
    (
        "sort",
        "# ============================================================================\n# Sorting\n# ============================================================================",
    ),
    (
        "logging",
        "# ============================================================================\n# Logging\n# ============================================================================\n# RUST_LOG takes precedence over this section when set.",
    ),
];

/// Trailing example for per-column overrides; `[columns]` is never serialized when empty.
const COLUMNS_EXAMPLE: &str = "\n# ============================================================================\n# Column Overrides\n# ============================================================================\n# One table per column key. All fields are optional.\n#   type: text, number, date, boolean, currency or custom\n#   formatter: percent, uppercase, lowercase, iso_date or thousands\n#\n# [columns.salary]\n# label = \"Salary\"\n# type = \"currency\"\n# priority = 1\n# sortable = true\n# filterable = true\n# case_sensitive = false\n# formatter = \"thousands\"\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub currency_symbol: String,
    pub thousands_separator: String,
    pub decimal_separator: String,
    pub date_format: String,
    pub true_label: String,
    pub false_label: String,
    pub cell_padding: usize,
    pub max_column_width: usize,
    pub max_columns: Option<usize>,
}

const DISPLAY_COMMENTS: &[(&str, &str)] = &[
    ("currency_symbol", "Symbol placed before currency values"),
    (
        "thousands_separator",
        "Digit grouping separator for currency values",
    ),
    ("decimal_separator", "Decimal separator for currency values"),
    (
        "date_format",
        "strftime-style format for date cells\nExamples: \"%m/%d/%Y\", \"%Y-%m-%d\", \"%d %b %Y\"",
    ),
    ("true_label", "Text shown for true boolean cells"),
    ("false_label", "Text shown for false boolean cells"),
    ("cell_padding", "Spaces between columns in printed tables"),
    (
        "max_column_width",
        "Longer cells are truncated with an ellipsis (0 disables truncation)",
    ),
    (
        "max_columns",
        "Show at most this many columns, keeping the highest priority ones\nOverridden by --max-columns",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub page_size: usize,
}

const PAGINATION_COMMENTS: &[(&str, &str)] = &[(
    "page_size",
    "Rows per page (must be greater than 0)\nOverridden by --page-size",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SortConfig {
    pub case_sensitive: bool,
}

const SORT_COMMENTS: &[(&str, &str)] = &[(
    "case_sensitive",
    "Compare text case-sensitively when sorting\nColumns can override this with case_sensitive",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

const LOGGING_COMMENTS: &[(&str, &str)] = &[(
    "level",
    "Log level: error, warn, info, debug, trace or off\n--debug forces debug",
)];

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

/// Optional overrides applied to an inferred column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ColumnOverride {
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ColumnType>,
    pub priority: Option<u32>,
    pub sortable: Option<bool>,
    pub filterable: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub formatter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            display: DisplayConfig::default(),
            pagination: PaginationConfig::default(),
            sort: SortConfig::default(),
            logging: LoggingConfig::default(),
            columns: BTreeMap::new(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let options = DisplayOptions::default();
        Self {
            currency_symbol: options.currency_symbol,
            thousands_separator: options.thousands_separator,
            decimal_separator: options.decimal_separator,
            date_format: options.date_format,
            true_label: options.true_label,
            false_label: options.false_label,
            cell_padding: 2,
            max_column_width: 40,
            max_columns: None,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 25 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let config_manager = ConfigManager::new(app_name)?;
        Self::load_from(&config_manager)
    }

    /// Load configuration using the config file managed by `config_manager`
    pub fn load_from(config_manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();

        let user_config = Self::load_user_config(config_manager)?;
        config.merge(user_config);

        config.validate()?;

        Ok(config)
    }

    fn load_user_config(config_manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.display.merge(other.display);
        self.pagination.merge(other.pagination);
        self.sort.merge(other.sort);
        self.logging.merge(other.logging);
        for (key, column) in other.columns {
            self.columns.entry(key).or_default().merge(column);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.pagination.page_size == 0 {
            return Err(eyre!("page_size must be greater than 0"));
        }

        if self.display.max_columns == Some(0) {
            return Err(eyre!("max_columns must be greater than 0 when set"));
        }

        validate_date_format(&self.display.date_format)
            .map_err(|e| eyre!("Invalid date_format '{}': {}", self.display.date_format, e))?;

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(eyre!(
                "Invalid logging level: {}. Must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }

    /// Display tokens for rendering cells.
    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            currency_symbol: self.display.currency_symbol.clone(),
            thousands_separator: self.display.thousands_separator.clone(),
            decimal_separator: self.display.decimal_separator.clone(),
            date_format: self.display.date_format.clone(),
            true_label: self.display.true_label.clone(),
            false_label: self.display.false_label.clone(),
        }
    }

    /// Apply display tokens, the sort case setting and per-column overrides to `columns`.
    /// Returns the override keys that name no column.
    pub fn apply_to(&self, columns: &mut ColumnSet) -> Vec<String> {
        let mut unknown = Vec::new();
        *columns = std::mem::take(columns).with_display(self.display_options());

        let keys: Vec<String> = columns.iter().map(|c| c.key.clone()).collect();
        for key in &keys {
            if let Some(column) = columns.get_mut(key) {
                column.case_sensitive = self.sort.case_sensitive;
            }
        }

        for (key, column_override) in &self.columns {
            match columns.get_mut(key) {
                Some(column) => column_override.apply(column),
                None => unknown.push(key.clone()),
            }
        }
        unknown
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.currency_symbol != default.currency_symbol {
            self.currency_symbol = other.currency_symbol;
        }
        if other.thousands_separator != default.thousands_separator {
            self.thousands_separator = other.thousands_separator;
        }
        if other.decimal_separator != default.decimal_separator {
            self.decimal_separator = other.decimal_separator;
        }
        if other.date_format != default.date_format {
            self.date_format = other.date_format;
        }
        if other.true_label != default.true_label {
            self.true_label = other.true_label;
        }
        if other.false_label != default.false_label {
            self.false_label = other.false_label;
        }
        if other.cell_padding != default.cell_padding {
            self.cell_padding = other.cell_padding;
        }
        if other.max_column_width != default.max_column_width {
            self.max_column_width = other.max_column_width;
        }
        if other.max_columns.is_some() {
            self.max_columns = other.max_columns;
        }
    }
}

impl PaginationConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PaginationConfig::default();
        if other.page_size != default.page_size {
            self.page_size = other.page_size;
        }
    }
}

impl SortConfig {
    pub fn merge(&mut self, other: Self) {
        let default = SortConfig::default();
        if other.case_sensitive != default.case_sensitive {
            self.case_sensitive = other.case_sensitive;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        if other.level != default.level {
            self.level = other.level;
        }
    }
}

impl ColumnOverride {
    pub fn merge(&mut self, other: Self) {
        if other.label.is_some() {
            self.label = other.label;
        }
        if other.kind.is_some() {
            self.kind = other.kind;
        }
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.sortable.is_some() {
            self.sortable = other.sortable;
        }
        if other.filterable.is_some() {
            self.filterable = other.filterable;
        }
        if other.case_sensitive.is_some() {
            self.case_sensitive = other.case_sensitive;
        }
        if other.formatter.is_some() {
            self.formatter = other.formatter;
        }
    }

    fn apply(&self, column: &mut ColumnDef) {
        if let Some(label) = &self.label {
            column.label = label.clone();
        }
        if let Some(kind) = self.kind {
            column.kind = Some(kind);
        }
        if let Some(priority) = self.priority {
            column.priority = priority;
        }
        if let Some(sortable) = self.sortable {
            column.sortable = sortable;
        }
        if let Some(filterable) = self.filterable {
            column.filterable = filterable;
        }
        if let Some(case_sensitive) = self.case_sensitive {
            column.case_sensitive = case_sensitive;
        }
        if let Some(formatter) = &self.formatter {
            column.formatter_id = Some(formatter.clone());
        }
    }
}
