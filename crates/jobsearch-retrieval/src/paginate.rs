use serde::{Deserialize, Serialize};

/// Page metadata returned with every search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: usize,
    /// Page size after clamping.
    pub limit: usize,
    /// Total number of ranked results across all pages.
    pub total: usize,
    /// `ceil(total / limit)`.
    pub total_pages: usize,
}

/// Slice one page out of `items`.
///
/// `page` is 1-based and values below 1 are treated as 1. A page past the end
/// yields an empty slice with accurate totals.
pub fn paginate<T>(items: &[T], page: usize, limit: usize) -> (&[T], Pagination) {
    let page = page.max(1);
    let limit = limit.max(1);
    let total = items.len();
    let meta = Pagination {
        page,
        limit,
        total,
        total_pages: total.div_ceil(limit),
    };

    let start = (page - 1).saturating_mul(limit);
    if start >= total {
        return (&[], meta);
    }
    let end = start.saturating_add(limit).min(total);
    (&items[start..end], meta)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_cover_everything_once() {
        let items: Vec<u32> = (0..45).collect();
        let mut seen = Vec::new();
        for page in 1..=3 {
            let (slice, meta) = paginate(&items, page, 20);
            assert_eq!(meta.total, 45);
            assert_eq!(meta.total_pages, 3);
            seen.extend_from_slice(slice);
        }
        assert_eq!(seen, items);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let items: Vec<u32> = (0..10).collect();
        let (slice, meta) = paginate(&items, 3, 25);
        assert!(slice.is_empty());
        assert_eq!(meta.total, 10);
        assert_eq!(meta.total_pages, 1);
    }

    #[test]
    fn test_empty_input_has_zero_pages() {
        let items: Vec<u32> = Vec::new();
        let (slice, meta) = paginate(&items, 1, 20);
        assert!(slice.is_empty());
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let items = [1, 2, 3];
        let (slice, meta) = paginate(&items, 0, 2);
        assert_eq!(slice, &[1, 2]);
        assert_eq!(meta.page, 1);
    }

    #[test]
    fn test_serializes_camel_case() {
        let (_, meta) = paginate(&[1, 2, 3], 1, 2);
        let json = serde_json::to_value(meta).unwrap();
        assert_eq!(json["totalPages"], 2);
    }
}
