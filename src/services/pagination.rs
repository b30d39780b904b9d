use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::LedgerError;

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    50
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Zero-based offset of the first item on the page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// Navigation metadata for one page of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total_pages(total, per_page),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1 && self.total_pages > 0
    }
}

/// One page of data plus its navigation state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.pagination.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.pagination.has_previous()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// `ceil(total / per_page)`, zero for an empty collection or a zero page size.
pub fn total_pages(total: u64, per_page: u64) -> u64 {
    if total == 0 || per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// Fixed-size slicing of in-memory collections.
///
/// Resetting to page 1 when the filter changes is the caller's job; the
/// paginator keeps no state between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: u64,
}

impl Paginator {
    pub fn new(page_size: u64) -> Result<Self, LedgerError> {
        if page_size == 0 {
            return Err(LedgerError::InvalidInput(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_pages(&self, total: usize) -> u64 {
        total_pages(total as u64, self.page_size)
    }

    /// The `page_number`th slice (1-indexed). Page 0 and pages past the end
    /// are empty.
    pub fn page<'a, T>(&self, items: &'a [T], page_number: u64) -> &'a [T] {
        if page_number == 0 {
            return &[];
        }
        let params = PaginationParams {
            page: page_number,
            per_page: self.page_size,
        };
        let start = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        if start >= items.len() {
            return &[];
        }
        let len = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        let end = start.saturating_add(len).min(items.len());
        &items[start..end]
    }

    #[instrument(skip(self, items), fields(page_size = self.page_size, total = items.len()))]
    pub fn paginate<T: Clone>(&self, items: &[T], page_number: u64) -> Page<T> {
        let data = self.page(items, page_number).to_vec();
        let pagination = PaginationMeta::new(page_number, self.page_size, items.len() as u64);
        debug!(
            page = page_number,
            returned = data.len(),
            total_pages = pagination.total_pages,
            "paginated collection"
        );
        Page { data, pagination }
    }
}
