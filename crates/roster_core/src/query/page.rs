//! Paging requests and results.
//!
//! A `Page` with `total_elements` is the counted flavour; a page obtained
//! with `CountMode::Skip` is a slice that only knows whether more rows exist.

use crate::query::sort::Sort;
use crate::repo::error::{RepoError, RepoResult};

/// Whether a paging call computes the total number of matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CountMode {
    #[default]
    Exact,
    /// Fetch one extra row to derive `has_next`; no total.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: usize,
    pub size: usize,
    pub sort: Option<Sort>,
    pub count: CountMode,
}

impl PageRequest {
    pub fn of(page: usize, size: usize) -> Self {
        Self {
            page,
            size,
            sort: None,
            count: CountMode::Exact,
        }
    }

    pub fn sorted(page: usize, size: usize, sort: Sort) -> Self {
        Self::of(page, size).with_sort(sort)
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Switches to slice semantics.
    pub fn without_count(mut self) -> Self {
        self.count = CountMode::Skip;
        self
    }

    /// Index of the first row of this page.
    pub fn offset(&self) -> RepoResult<usize> {
        if self.size == 0 {
            return Err(RepoError::invalid_query("page size must be at least 1"));
        }
        self.page
            .checked_mul(self.size)
            .ok_or_else(|| RepoError::invalid_query("page offset overflows"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    content: Vec<T>,
    number: usize,
    size: usize,
    has_next: bool,
    total_elements: Option<u64>,
}

impl<T> Page<T> {
    pub(crate) fn new(
        content: Vec<T>,
        request: &PageRequest,
        has_next: bool,
        total_elements: Option<u64>,
    ) -> Self {
        Self {
            content,
            number: request.page,
            size: request.size,
            has_next,
            total_elements,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Zero-based page index.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Requested page size, not the number of rows returned.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next
    }

    /// `None` for pages fetched with `CountMode::Skip`.
    pub fn total_elements(&self) -> Option<u64> {
        self.total_elements
    }

    pub fn total_pages(&self) -> Option<u64> {
        let size = self.size as u64;
        self.total_elements.map(|total| total.div_ceil(size))
    }

    /// Converts the content, keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            has_next: self.has_next,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Page, PageRequest};
    use crate::repo::error::RepoError;

    #[test]
    fn offset_rejects_zero_size() {
        assert!(matches!(
            PageRequest::of(0, 0).offset(),
            Err(RepoError::InvalidQuery(_))
        ));
        assert_eq!(PageRequest::of(2, 3).offset().expect("offset in range"), 6);
    }

    #[test]
    fn total_pages_rounds_up_and_map_keeps_metadata() {
        let request = PageRequest::of(0, 3);
        let page = Page::new(vec![1, 2, 3], &request, true, Some(5));
        assert_eq!(page.total_pages(), Some(2));

        let mapped = page.map(|value| value * 10);
        assert_eq!(mapped.content(), &[10, 20, 30]);
        assert!(mapped.is_first());
        assert!(mapped.has_next());
        assert_eq!(mapped.total_elements(), Some(5));
    }
}
