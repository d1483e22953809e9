//! Page navigation for server-side paginated listings.

/// Number of pages above which [`page_range`] collapses the range.
pub const FULL_RANGE_LIMIT: u32 = 7;

/// Pages shown on each side of the current page in a collapsed range.
const WINDOW: u32 = 2;

/// One slot in a rendered page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    /// A page button.
    Page(u32),
    /// A gap marker.
    Ellipsis,
}

/// Pages to render for `current` out of `total`.
///
/// Up to [`FULL_RANGE_LIMIT`] pages are listed in full. Beyond that the
/// result is the first page, the pages within two of `current`, and the last
/// page, with an ellipsis wherever pages are skipped.
#[must_use]
pub fn page_range(current: u32, total: u32) -> Vec<PageItem> {
    if total <= FULL_RANGE_LIMIT {
        return (1..=total).map(PageItem::Page).collect();
    }

    let current = current.clamp(1, total);
    let start = current.saturating_sub(WINDOW).max(2);
    let end = (current + WINDOW).min(total - 1);

    let mut items = vec![PageItem::Page(1)];
    if start > 2 {
        items.push(PageItem::Ellipsis);
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total - 1 {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total));
    items
}

/// Current page of a listing, kept within the known page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
    total_pages: Option<u32>,
}

impl Pager {
    /// First page, page count unknown.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            page: 1,
            total_pages: None,
        }
    }

    /// Current page, starting at 1.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page count from the last response, if any.
    #[must_use]
    pub const fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Records the page count reported by the backend.
    ///
    /// Returns true if the current page was beyond the new count and moved
    /// back to the last page.
    pub fn set_total_pages(&mut self, total: u32) -> bool {
        self.total_pages = Some(total);
        let last = total.max(1);
        if self.page > last {
            self.page = last;
            return true;
        }
        false
    }

    /// Returns true if a previous page exists.
    #[must_use]
    pub const fn can_prev(&self) -> bool {
        self.page > 1
    }

    /// Returns true if a next page is known to exist.
    #[must_use]
    pub fn can_next(&self) -> bool {
        self.total_pages.is_some_and(|total| self.page < total)
    }

    /// Moves back one page. Returns false at the first page.
    pub const fn prev(&mut self) -> bool {
        if !self.can_prev() {
            return false;
        }
        self.page -= 1;
        true
    }

    /// Moves forward one page. Returns false at the last page.
    pub fn next(&mut self) -> bool {
        if !self.can_next() {
            return false;
        }
        self.page += 1;
        true
    }

    /// Jumps to `page`. Pages outside `[1, total_pages]` are refused; any
    /// positive page is accepted while the count is unknown.
    pub fn go_to(&mut self, page: u32) -> bool {
        let in_range = page >= 1 && self.total_pages.is_none_or(|total| page <= total);
        if !in_range || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    /// Back to page 1.
    pub const fn reset(&mut self) {
        self.page = 1;
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::new()
    }
}
