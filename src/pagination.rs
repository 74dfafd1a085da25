/// Page-based pagination shared by account and task listings
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// A 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Clamp to a valid page (>= 1) and limit (1..=100)
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

/// Listing metadata returned next to every page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub next_page: Option<u32>,
    pub prev_page: Option<u32>,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, pagination: Pagination) -> Self {
        let Pagination { page, limit } = pagination;
        let limit_i64 = i64::from(limit);
        let has_next = total > i64::from(page) * limit_i64;

        Self {
            total,
            next_page: has_next.then(|| page + 1),
            prev_page: (page > 1).then(|| page - 1),
            page,
            limit,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(0, 500);
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, MAX_LIMIT);
        assert_eq!(Pagination::new(3, 10).offset(), 20);
    }

    #[test]
    fn test_page_meta_middle_page() {
        let meta = PageMeta::new(25, Pagination::new(2, 10));
        assert_eq!(meta.next_page, Some(3));
        assert_eq!(meta.prev_page, Some(1));
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn test_page_meta_last_and_empty() {
        let meta = PageMeta::new(20, Pagination::new(2, 10));
        assert_eq!(meta.next_page, None);
        assert_eq!(meta.total_pages, 2);

        let empty = PageMeta::new(0, Pagination::default());
        assert_eq!(empty.next_page, None);
        assert_eq!(empty.prev_page, None);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_page_meta_serializes_camel_case() {
        let json = serde_json::to_value(PageMeta::new(1, Pagination::default())).unwrap();
        assert!(json.get("totalPages").is_some());
        assert!(json.get("nextPage").is_some());
    }
}
