//! Pagination helper types for store listings

use crate::error::{LibraryError, Result};
use serde::Serialize;

/// Pagination request parameters
///
/// Pages are numbered from 1. A request can only be built through
/// [`PageRequest::new`], so every instance has `page >= 1` and a non-zero
/// page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Create a new page request
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::PageRequest;
    ///
    /// let request = PageRequest::new(3, 20).unwrap();
    /// assert_eq!(request.offset(), 40);
    /// assert_eq!(request.limit(), 20);
    ///
    /// assert!(PageRequest::new(0, 20).is_err());
    /// ```
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page == 0 {
            return Err(LibraryError::InvalidPage { page });
        }
        if page_size == 0 {
            return Err(LibraryError::InvalidInput {
                field: "page_size".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of records to skip: `page_size * (page - 1)`
    pub fn offset(&self) -> u64 {
        u64::from(self.page_size) * u64::from(self.page - 1)
    }

    /// Get the LIMIT value (same as page_size)
    pub fn limit(&self) -> u32 {
        self.page_size
    }
}

/// Paginated response containing items and metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number (1-based)
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
        }
    }

    /// Number of pages needed to list `total` items
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_has_zero_offset() {
        let request = PageRequest::new(1, 20).unwrap();
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_offset_formula() {
        for page in 1..=10u32 {
            let request = PageRequest::new(page, 25).unwrap();
            assert_eq!(request.offset(), 25 * u64::from(page - 1));
        }
    }

    #[test]
    fn test_offset_does_not_overflow_u32() {
        let request = PageRequest::new(u32::MAX, 1000).unwrap();
        assert_eq!(request.offset(), 1000 * (u64::from(u32::MAX) - 1));
    }

    #[test]
    fn test_page_zero_rejected() {
        let err = PageRequest::new(0, 20).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidPage { page: 0 }));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = PageRequest::new(1, 0).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidInput { .. }));
    }

    #[test]
    fn test_page_navigation() {
        let request = PageRequest::new(3, 20).unwrap();
        let page = Page::new(vec![0u8; 17], 57, request);

        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next());
        assert!(page.has_previous());

        let first = Page::new(vec![0u8; 20], 57, PageRequest::new(1, 20).unwrap());
        assert!(first.has_next());
        assert!(!first.has_previous());
    }

    #[test]
    fn test_empty_listing_has_no_pages() {
        let page: Page<u8> = Page::new(Vec::new(), 0, PageRequest::new(1, 20).unwrap());
        assert_eq!(page.total_pages(), 0);
        assert!(!page.has_next());
    }
}
