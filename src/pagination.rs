use std::ops::RangeInclusive;

use crate::domain::{DEFAULT_PAGE_SIZE, ViewError};

/// Page size and 1-based current page over the filtered, sorted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    page_size: usize,
    current_page: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

impl PageState {
    pub fn new(page_size: usize) -> Result<Self, ViewError> {
        let mut state = Self::default();
        state.set_page_size(page_size)?;
        Ok(state)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Changes the page size and goes back to page 1. Zero is rejected and
    /// the old size kept.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), ViewError> {
        if page_size == 0 {
            return Err(ViewError::InvalidPageSize {
                value: page_size.to_string(),
            });
        }
        self.page_size = page_size;
        self.current_page = 1;
        Ok(())
    }

    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size).max(1)
    }

    /// The slice of `items` on the current page. Empty past the last page.
    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.current_page - 1).saturating_mul(self.page_size);
        if start >= items.len() {
            return &[];
        }
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }

    /// Jumps to page `n` when it exists. Out-of-range requests are ignored
    /// and reported as `false`.
    pub fn go_to(&mut self, n: usize, count: usize) -> bool {
        if n >= 1 && n <= self.total_pages(count) {
            self.current_page = n;
            true
        } else {
            false
        }
    }

    pub fn first(&mut self) {
        self.current_page = 1;
    }

    pub fn last(&mut self, count: usize) {
        self.current_page = self.total_pages(count);
    }

    pub fn next(&mut self, count: usize) -> bool {
        self.go_to(self.current_page + 1, count)
    }

    pub fn prev(&mut self, count: usize) -> bool {
        self.current_page > 1 && self.go_to(self.current_page - 1, count)
    }

    /// Pulls the current page back inside `1..=total_pages(count)`.
    pub fn clamp(&mut self, count: usize) {
        self.current_page = self.current_page.clamp(1, self.total_pages(count));
    }

    /// 1-based first and last row numbers shown on the current page, `(0, 0)`
    /// when there is nothing to show.
    pub fn row_range(&self, count: usize) -> (usize, usize) {
        let start = (self.current_page - 1) * self.page_size;
        if start >= count {
            return (0, 0);
        }
        (start + 1, (start + self.page_size).min(count))
    }

    /// Page numbers around the current one, as offered by a pager widget.
    pub fn window(&self, count: usize, radius: usize) -> RangeInclusive<usize> {
        let total = self.total_pages(count);
        let lo = self.current_page.saturating_sub(radius).max(1);
        let hi = (self.current_page + radius).min(total);
        lo..=hi
    }
}

/// Parses a page size typed by the user.
pub fn parse_page_size(input: &str) -> Result<usize, ViewError> {
    match input.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ViewError::InvalidPageSize {
            value: input.trim().to_string(),
        }),
    }
}
