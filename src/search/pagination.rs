//! Offset pagination for search requests.
//!
//! Pages are 1-based; page 0 and page 1 both start at offset 0.

use crate::constants::pagination::{MAX_MAP_PAGE_SIZE, MAX_PAGE_SIZE};

/// Offset of the first hit for `page`
pub fn from(page: i64, page_size: i64) -> i64 {
    page_size.saturating_mul(page.saturating_sub(1)).max(0)
}

/// Page size clamped to `1..=500`
pub fn size(page_size: i64) -> i64 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Map-view page size clamped to `1..=10000`
pub fn maximum_size(page_size: i64) -> i64 {
    page_size.clamp(1, MAX_MAP_PAGE_SIZE)
}

/// Number of pages needed for `number_of_results` hits; 0 when there are none
pub fn total_pages(number_of_results: i64, page_size: i64) -> i64 {
    if number_of_results <= 0 {
        return 0;
    }
    let page_size = page_size.max(1);
    (number_of_results + page_size - 1) / page_size
}
