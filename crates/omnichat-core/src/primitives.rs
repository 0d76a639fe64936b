//! # Primitives Module
//!
//! Hard limits enforced at the directory boundary. The HTTP layer validates
//! against the same constants before data reaches the stores.

/// Maximum username length in bytes.
pub const MAX_USERNAME_LENGTH: usize = 120;

/// Maximum display-name length in bytes.
pub const MAX_NAME_LENGTH: usize = 256;

/// Default page size for listing operations when the caller gives none.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Upper bound on a single listing page. Larger requests are clamped,
/// never rejected.
pub const MAX_PAGE_SIZE: usize = 500;

/// A pagination window over a listing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub count: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            count: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    /// Build a page window, clamping `count` to [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn new(offset: usize, count: usize) -> Self {
        Self {
            offset,
            count: count.min(MAX_PAGE_SIZE),
        }
    }

    /// Apply the window to a full result set, returning the page slice.
    #[must_use]
    pub fn slice<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset)
            .take(self.count)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_clamps_count() {
        let page = Page::new(0, MAX_PAGE_SIZE + 1);
        assert_eq!(page.count, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_slice_past_end_is_empty() {
        let items: Vec<u32> = (0..10).collect();
        let page = Page::new(20, 5);
        assert!(page.slice(&items).is_empty());
    }

    #[test]
    fn test_page_slice_window() {
        let items: Vec<u32> = (0..10).collect();
        let page = Page::new(3, 4);
        assert_eq!(page.slice(&items), vec![3, 4, 5, 6]);
    }
}
