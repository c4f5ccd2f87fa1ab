use std::num::NonZeroUsize;

use crate::row::Row;

/// One page of rows plus where it sits in the full result.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<'a> {
    pub rows: Vec<&'a Row>,
    /// 1-based page actually shown, after clamping.
    pub page: usize,
    pub total_pages: usize,
}

/// Number of pages needed for `count` rows. Never less than 1.
pub fn total_pages(count: usize, page_size: NonZeroUsize) -> usize {
    count.div_ceil(page_size.get()).max(1)
}

/// Clamp a requested 1-based page into `[1, total_pages]`.
pub fn clamp_page(page: i64, total_pages: usize) -> usize {
    let last = total_pages.max(1);
    if page < 1 {
        1
    } else {
        usize::try_from(page).map_or(last, |p| p.min(last))
    }
}

/// Slice out one page. Out-of-range pages are clamped, never rejected.
pub fn paginate(rows: Vec<&Row>, page: i64, page_size: NonZeroUsize) -> Paged<'_> {
    let total_pages = total_pages(rows.len(), page_size);
    let page = clamp_page(page, total_pages);
    let start = (page - 1) * page_size.get();
    let rows = rows
        .into_iter()
        .skip(start)
        .take(page_size.get())
        .collect();
    Paged {
        rows,
        page,
        total_pages,
    }
}
