//! Page arithmetic for 1-based, clamped pagination.

use serde::Serialize;

/// Where a requested page lands in a filtered collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Requested page after clamping into `[1, total_pages]`.
    pub current_page: usize,
    /// `ceil(total_items / page_size)`, never less than 1.
    pub total_pages: usize,
    /// Effective page size (a zero request is treated as 1).
    pub page_size: usize,
    /// Slice bounds into the filtered collection.
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    /// Compute the window for `page` over `total_items`.
    ///
    /// Out-of-range pages clamp to the nearest valid page, so a page past
    /// the end shows the last page instead of nothing.
    pub fn new(total_items: usize, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_items.div_ceil(page_size).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = ((current_page - 1) * page_size).min(total_items);
        let end = (start + page_size).min(total_items);
        Self {
            current_page,
            total_pages,
            page_size,
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Take the page window out of `items`.
pub fn paginate<T>(items: Vec<T>, window: &PageWindow) -> Vec<T> {
    items
        .into_iter()
        .skip(window.start)
        .take(window.len())
        .collect()
}
