//! Offset pagination helpers shared by the query executor and its callers.

use serde::{Deserialize, Serialize};

use super::filter::FilterDescriptor;

/// Offset/limit window requested from a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u32,
}

impl PageWindow {
    pub fn new(offset: u64, limit: u32) -> Self {
        Self { offset, limit }
    }
}

impl From<&FilterDescriptor> for PageWindow {
    fn from(filter: &FilterDescriptor) -> Self {
        Self::new(filter.offset(), filter.page_size())
    }
}

/// One page of results together with totals computed over the whole match set.
///
/// Pages read back from the cache are shared snapshots; callers treat them as
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u64,
    pub total_count: u64,
}

impl<T> ResultPage<T> {
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            items,
            page,
            total_pages: total_pages(total_count, page_size),
            total_count,
        }
    }
}

/// `ceil(total_count / page_size)`, zero when nothing matched.
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total_count.div_ceil(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(101, 100), 2);
    }

    #[test]
    fn total_pages_matches_ceiling_division_for_every_small_case() {
        for page_size in 1..=12u32 {
            for count in 0..=60u64 {
                let expected = (count as f64 / f64::from(page_size)).ceil() as u64;
                assert_eq!(total_pages(count, page_size), expected);
            }
        }
    }

    #[test]
    fn result_page_serializes_with_api_field_names() {
        let page = ResultPage::new(vec![1, 2], 1, 2, 3);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [1, 2], "page": 1, "totalPages": 2, "totalCount": 3})
        );
    }
}
