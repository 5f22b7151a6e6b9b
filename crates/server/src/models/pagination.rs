//! Page-based pagination for list endpoints.

use serde::{Deserialize, Serialize};

/// Default page size when `per_page` is omitted.
pub const DEFAULT_PER_PAGE: u32 = 20;
/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Raw `?page=&per_page=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

/// Rejected pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("page must be at least 1")]
    Page,
    #[error("per_page must be between 1 and {MAX_PER_PAGE}")]
    PerPage,
}

impl PageParams {
    /// Apply defaults and bounds.
    ///
    /// # Errors
    ///
    /// Returns `PageError` when `page` is zero or `per_page` is outside `1..=100`.
    pub fn validate(self) -> Result<PageRequest, PageError> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(PageError::Page);
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(PageError::PerPage);
        }
        Ok(PageRequest { page, per_page })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    /// SQL `LIMIT`.
    #[must_use]
    pub fn limit(self) -> i64 {
        i64::from(self.per_page)
    }

    /// SQL `OFFSET`.
    #[must_use]
    pub fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

/// Pagination metadata returned alongside list data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

/// A page of results: `{data, pagination}`.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(data: Vec<T>, request: PageRequest, total: i64) -> Self {
        let per_page = i64::from(request.per_page);
        let total_pages = if total <= 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            data,
            pagination: PageMeta {
                page: request.page,
                per_page: request.per_page,
                total,
                total_pages,
            },
        }
    }

    /// Transform each item, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
