//! Paging types for history reads

use super::error::LedgerError;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: usize,
    size: usize,
}

impl PageRequest {
    /// # Errors
    ///
    /// Returns `InvalidInput` if `size` is zero.
    pub fn new(page: usize, size: usize) -> Result<Self, LedgerError> {
        if size == 0 {
            return Err(LedgerError::invalid_input(
                "page_size",
                "page size must be at least 1",
            ));
        }
        Ok(PageRequest { page, size })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Always at least 1
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// One page of results plus totals
///
/// Built only from a validated [`PageRequest`], so the page size is never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: usize,
    page: usize,
    size: usize,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: usize) -> Self {
        Page {
            content,
            page: request.page,
            size: request.size,
            total_elements,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn total_pages(&self) -> usize {
        self.total_elements.div_ceil(self.size)
    }

    pub fn is_last(&self) -> bool {
        self.page.saturating_add(1) >= self.total_pages()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}
