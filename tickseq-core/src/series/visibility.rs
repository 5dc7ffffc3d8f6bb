//! Index translation between a series' stored points and what consumers see.
//!
//! With [`SeriesVisibility::CompletedIntervalsOnly`] the newest point is
//! hidden: the visible count is one less than the stored count, an insert at
//! the newest position surfaces as the now-completed previous point, and
//! updates to the newest point are not reported.

use crate::types::SeriesVisibility;

pub(crate) const fn visible_count(visibility: SeriesVisibility, total: usize) -> usize {
    match visibility {
        SeriesVisibility::CompletedIntervalsOnly => total.saturating_sub(1),
        _ => total,
    }
}

/// `total` already includes the inserted point.
pub(crate) const fn visible_insert(
    visibility: SeriesVisibility,
    index: usize,
    total: usize,
) -> Option<usize> {
    match visibility {
        SeriesVisibility::CompletedIntervalsOnly if index + 1 == total => index.checked_sub(1),
        _ => Some(index),
    }
}

/// `total` already includes the run. Returns `(start, count)`.
pub(crate) const fn visible_range(
    visibility: SeriesVisibility,
    index: usize,
    count: usize,
    total: usize,
) -> Option<(usize, usize)> {
    match visibility {
        SeriesVisibility::CompletedIntervalsOnly if index + count == total => {
            if index > 0 {
                Some((index - 1, count))
            } else if count > 1 {
                Some((0, count - 1))
            } else {
                None
            }
        }
        _ => Some((index, count)),
    }
}

pub(crate) const fn visible_update(
    visibility: SeriesVisibility,
    index: usize,
    total: usize,
) -> Option<usize> {
    match visibility {
        SeriesVisibility::CompletedIntervalsOnly if index + 1 == total => None,
        _ => Some(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: SeriesVisibility = SeriesVisibility::AllIntervals;
    const DONE: SeriesVisibility = SeriesVisibility::CompletedIntervalsOnly;

    #[test]
    fn all_intervals_is_identity() {
        assert_eq!(visible_count(ALL, 3), 3);
        assert_eq!(visible_insert(ALL, 2, 3), Some(2));
        assert_eq!(visible_range(ALL, 1, 2, 3), Some((1, 2)));
        assert_eq!(visible_update(ALL, 2, 3), Some(2));
    }

    #[test]
    fn newest_point_is_hidden() {
        assert_eq!(visible_count(DONE, 0), 0);
        assert_eq!(visible_count(DONE, 3), 2);
        // First point ever: nothing completed yet.
        assert_eq!(visible_insert(DONE, 0, 1), None);
        // New newest point completes the previous one.
        assert_eq!(visible_insert(DONE, 2, 3), Some(1));
        // Older insert is visible as-is.
        assert_eq!(visible_insert(DONE, 0, 3), Some(0));
        assert_eq!(visible_update(DONE, 2, 3), None);
        assert_eq!(visible_update(DONE, 1, 3), Some(1));
    }

    #[test]
    fn trailing_run_shifts_back() {
        assert_eq!(visible_range(DONE, 2, 3, 5), Some((1, 3)));
        assert_eq!(visible_range(DONE, 0, 3, 3), Some((0, 2)));
        assert_eq!(visible_range(DONE, 0, 1, 1), None);
        assert_eq!(visible_range(DONE, 1, 2, 5), Some((1, 2)));
    }
}
