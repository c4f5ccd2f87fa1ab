//! Plain text table output for the command line.

use crate::column::{ColumnDef, ColumnSet};
use crate::pipeline::PipelineResult;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Spaces between columns.
    pub cell_padding: usize,
    /// Longer cells are cut with an ellipsis; 0 disables truncation.
    pub max_column_width: usize,
    /// Show at most this many columns, chosen by priority.
    pub max_columns: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            cell_padding: 2,
            max_column_width: 40,
            max_columns: None,
        }
    }
}

/// Render the page as an aligned table followed by a summary line.
pub fn render(result: &PipelineResult<'_>, columns: &ColumnSet, options: &RenderOptions) -> String {
    let visible: Vec<&ColumnDef> = match options.max_columns {
        Some(max) => columns.visible_columns(max),
        None => columns.iter().collect(),
    };

    let header: Vec<String> = visible
        .iter()
        .map(|c| truncate(&c.label, options.max_column_width))
        .collect();
    let body: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| {
            visible
                .iter()
                .map(|c| truncate(&single_line(&columns.display_string(row, c)), options.max_column_width))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| width(h)).collect();
    for cells in &body {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(width(cell));
        }
    }

    let mut out = String::new();
    if !visible.is_empty() {
        push_line(&mut out, &header, &widths, options.cell_padding);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, &rule, &widths, options.cell_padding);
        for cells in &body {
            push_line(&mut out, cells, &widths, options.cell_padding);
        }
    }
    out.push_str(&summary(result));
    out.push('\n');
    out
}

/// "N results, page X of Y"
pub fn summary(result: &PipelineResult<'_>) -> String {
    let noun = if result.total_count == 1 {
        "result"
    } else {
        "results"
    };
    format!(
        "{} {}, page {} of {}",
        result.total_count, noun, result.page, result.total_pages
    )
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize], padding: usize) {
    let gap = " ".repeat(padding);
    let mut line = String::new();
    for (idx, (cell, w)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str(&gap);
        }
        line.push_str(cell);
        line.push_str(&" ".repeat(w.saturating_sub(width(cell))));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn single_line(s: &str) -> String {
    s.replace(['\n', '\r', '\t'], " ")
}

fn truncate(s: &str, max: usize) -> String {
    if max == 0 || width(s) <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max.saturating_sub(1)).collect();
    cut.push(ELLIPSIS);
    cut
}
