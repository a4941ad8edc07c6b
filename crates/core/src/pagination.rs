//! Offset/limit helpers for in-memory pagination of cached lists.

/// Clamp a caller-supplied limit: missing or non-positive values fall back
/// to `default`, anything above `max` is capped.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    match limit {
        Some(l) if l > 0 => l.min(max),
        _ => default,
    }
}

/// Clamp a caller-supplied offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// A page cut out of a list of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub start: usize,
    pub end: usize,
    pub has_more: bool,
}

/// Compute slice bounds for `offset`/`limit` over `total` items.
///
/// An offset past the end yields an empty page. `has_more` is true when
/// `offset + limit < total`.
pub fn page_bounds(total: usize, offset: i64, limit: i64) -> PageBounds {
    let offset = offset.max(0) as usize;
    let limit = limit.max(0) as usize;
    let start = offset.min(total);
    let end = offset.saturating_add(limit).min(total);
    PageBounds {
        start,
        end,
        has_more: offset.saturating_add(limit) < total,
    }
}

/// Slice `items` according to `offset`/`limit`.
pub fn paginate<T: Clone>(items: &[T], offset: i64, limit: i64) -> (Vec<T>, bool) {
    let b = page_bounds(items.len(), offset, limit);
    (items[b.start..b.end].to_vec(), b.has_more)
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- clamp_limit ---------------------------------------------------------

    #[test]
    fn clamp_limit_uses_default_when_none_or_non_positive() {
        assert_eq!(clamp_limit(None, 50, 100), 50);
        assert_eq!(clamp_limit(Some(0), 50, 100), 50);
        assert_eq!(clamp_limit(Some(-3), 50, 100), 50);
    }

    #[test]
    fn clamp_limit_respects_max() {
        assert_eq!(clamp_limit(Some(500), 50, 200), 200);
        assert_eq!(clamp_limit(Some(20), 50, 200), 20);
    }

    #[test]
    fn clamp_offset_floors_at_zero() {
        assert_eq!(clamp_offset(None), 0);
        assert_eq!(clamp_offset(Some(-10)), 0);
        assert_eq!(clamp_offset(Some(7)), 7);
    }

    // -- page_bounds ---------------------------------------------------------

    #[test]
    fn middle_page_has_more() {
        let b = page_bounds(120, 50, 50);
        assert_eq!((b.start, b.end, b.has_more), (50, 100, true));
    }

    #[test]
    fn last_page_exactly_full_has_no_more() {
        let b = page_bounds(100, 50, 50);
        assert_eq!((b.start, b.end, b.has_more), (50, 100, false));
    }

    #[test]
    fn offset_past_end_is_empty() {
        let b = page_bounds(10, 40, 50);
        assert_eq!((b.start, b.end, b.has_more), (10, 10, false));
    }

    #[test]
    fn paginate_slices_items() {
        let items: Vec<u32> = (0..5).collect();
        assert_eq!(paginate(&items, 1, 2), (vec![1, 2], true));
        assert_eq!(paginate(&items, 3, 10), (vec![3, 4], false));
    }
}
