use std::{error::Error, fmt::Display};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Pagination information, `page` is one-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Result<Self, InvalidPagination> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(InvalidPagination::Page(page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(InvalidPagination::PageSize(page_size));
        }

        Ok(Self {
            page,
            page_size,
            total: 0,
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn with_total(mut self, total: i64) -> Self {
        self.total = total;
        self
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidPagination {
    Page(i64),
    PageSize(i64),
}

impl Error for InvalidPagination {}

impl Display for InvalidPagination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            InvalidPagination::Page(page) => crate::invalid_value_because_message(
                "page",
                format!("must be at least 1, got {}", page),
            ),
            InvalidPagination::PageSize(page_size) => crate::invalid_value_because_message(
                "page_size",
                format!("must be between 1 and {}, got {}", MAX_PAGE_SIZE, page_size),
            ),
        };
        write!(f, "{}", output)
    }
}
