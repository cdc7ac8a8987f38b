//! Offset pagination over fully materialized result sets.
//!
//! Aggregates are cached as a whole and sliced per request, so pagination
//! never touches the data source and `total_items` always reflects the full
//! set.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Requested page (1-based) and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self { page, page_size }
    }
}

/// One page of a larger ordered result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    /// Size of the full result set, not of this page.
    pub total_items: usize,
}

impl<T: Clone> PagedResult<T> {
    /// Slice `items` according to `request`.
    pub fn from_full_set(items: &[T], request: PageRequest) -> Self {
        Self {
            data: paginate(items, request.page, request.page_size),
            page: request.page,
            page_size: request.page_size,
            total_items: items.len(),
        }
    }
}

/// Skip `(page - 1) * page_size` items and take the next `page_size`.
///
/// Non-positive `page` or `page_size`, and offsets that overflow, yield an
/// empty page instead of an error.
pub fn paginate<T: Clone>(items: &[T], page: i64, page_size: i64) -> Vec<T> {
    if page < 1 || page_size < 1 {
        return Vec::new();
    }

    let Some(offset) = (page - 1).checked_mul(page_size) else {
        return Vec::new();
    };
    let (Ok(offset), Ok(take)) = (usize::try_from(offset), usize::try_from(page_size)) else {
        return Vec::new();
    };

    items.iter().skip(offset).take(take).cloned().collect()
}
