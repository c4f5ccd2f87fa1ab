//! The search → filter → sort → paginate pipeline and a small state holder
//! for callers that drive it interactively.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use crate::column::ColumnSet;
use crate::filter::{filter, FilterError, FilterSet, FilterSpec};
use crate::paginate::paginate;
use crate::row::{Row, RowId};
use crate::search::search;
use crate::sort::{sort, SortSpec};

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(25) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Everything one pipeline run needs besides the rows and columns.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub query: String,
    pub filters: FilterSet,
    pub sort: Option<SortSpec>,
    /// 1-based; clamped by the run.
    pub page: i64,
    pub page_size: NonZeroUsize,
}

impl Default for PipelineRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            filters: FilterSet::empty(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PipelineRequest {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_sort(mut self, sort: Option<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult<'a> {
    /// Rows on the current page.
    pub rows: Vec<&'a Row>,
    /// Rows that survived search and filter, before pagination.
    pub total_count: usize,
    pub total_pages: usize,
    /// Page actually shown, after clamping.
    pub page: usize,
}

/// Run the full pipeline. `rows` and `columns` are never modified.
pub fn run<'a>(rows: &'a [Row], request: &PipelineRequest, columns: &ColumnSet) -> PipelineResult<'a> {
    let input: Vec<&Row> = rows.iter().collect();
    let searched = search(input, &request.query, columns);
    let filtered = filter(searched, &request.filters, columns);
    let total_count = filtered.len();
    let sorted = sort(filtered, request.sort.as_ref(), columns);
    let paged = paginate(sorted, request.page, request.page_size);

    tracing::debug!(
        input = rows.len(),
        total = total_count,
        page = paged.page,
        total_pages = paged.total_pages,
        "pipeline run"
    );

    PipelineResult {
        rows: paged.rows,
        total_count,
        total_pages: paged.total_pages,
        page: paged.page,
    }
}

/// Caller-side table state: the current request plus a row selection.
///
/// Changing the query or filters returns to the first page. [`refresh`](Self::refresh)
/// stores the clamped page so the next run starts from a valid page.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    request: PipelineRequest,
    selection: BTreeSet<RowId>,
}

impl TableState {
    pub fn new(request: PipelineRequest) -> Self {
        Self {
            request,
            selection: BTreeSet::new(),
        }
    }

    pub fn request(&self) -> &PipelineRequest {
        &self.request
    }

    pub fn query(&self) -> &str {
        &self.request.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.request.query = query.into();
        self.request.page = 1;
    }

    pub fn add_filter(&mut self, spec: FilterSpec, columns: &ColumnSet) -> Result<(), FilterError> {
        self.request.filters.push(spec, columns)?;
        self.request.page = 1;
        Ok(())
    }

    pub fn set_filters(&mut self, filters: FilterSet) {
        self.request.filters = filters;
        self.request.page = 1;
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<FilterSpec> {
        let removed = self.request.filters.remove(index);
        if removed.is_some() {
            self.request.page = 1;
        }
        removed
    }

    pub fn clear_filters(&mut self) {
        self.set_filters(FilterSet::empty());
    }

    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.request.sort.as_ref()
    }

    pub fn set_sort(&mut self, sort: Option<SortSpec>) {
        self.request.sort = sort;
    }

    /// Header activation on `column`: none → ascending → descending → none.
    pub fn toggle_sort(&mut self, column: &str) {
        self.request.sort = SortSpec::toggle(self.request.sort.as_ref(), column);
    }

    pub fn page(&self) -> i64 {
        self.request.page
    }

    pub fn set_page(&mut self, page: i64) {
        self.request.page = page;
    }

    pub fn next_page(&mut self) {
        self.request.page = self.request.page.saturating_add(1);
    }

    pub fn prev_page(&mut self) {
        self.request.page = self.request.page.saturating_sub(1).max(1);
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.request.page_size
    }

    /// Changing the page size keeps the first visible row on screen.
    pub fn set_page_size(&mut self, page_size: NonZeroUsize) {
        let page = usize::try_from(self.request.page.max(1)).unwrap_or(usize::MAX);
        let first = (page - 1).saturating_mul(self.request.page_size.get());
        self.request.page_size = page_size;
        self.request.page =
            i64::try_from(first / page_size.get()).map_or(i64::MAX, |p| p.saturating_add(1));
    }

    /// Run the pipeline and keep the page it settled on.
    pub fn refresh<'a>(&mut self, rows: &'a [Row], columns: &ColumnSet) -> PipelineResult<'a> {
        let result = run(rows, &self.request, columns);
        self.request.page = result.page as i64;
        result
    }

    pub fn is_selected(&self, id: &RowId) -> bool {
        self.selection.contains(id)
    }

    /// Flip one row's selection. Returns whether it is now selected.
    pub fn toggle_selected(&mut self, id: RowId) -> bool {
        if self.selection.remove(&id) {
            false
        } else {
            self.selection.insert(id);
            true
        }
    }

    /// Select every row on the given page, keeping earlier selections.
    pub fn select_all_visible(&mut self, result: &PipelineResult<'_>) {
        self.selection
            .extend(result.rows.iter().map(|row| row.id.clone()));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> &BTreeSet<RowId> {
        &self.selection
    }
}
