use std::cmp::Ordering;
use std::ops::Index;

const DEFAULT_CAPACITY_INCREMENT: usize = 64;

/// Sorted, array-backed list with binary search and positional insertion.
///
/// The list never sorts itself: callers locate the insertion index with
/// [`ComparableList::binary_search_by`] and insert there, which keeps the
/// ordering invariant under the caller's comparison. Capacity grows in fixed
/// increments so bursts of inserts (gap padding) do not reallocate per item.
#[derive(Debug, Clone)]
pub struct ComparableList<T> {
    items: Vec<T>,
    capacity_increment: usize,
}

impl<T> Default for ComparableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComparableList<T> {
    /// Empty list with the default capacity increment.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity_increment(DEFAULT_CAPACITY_INCREMENT)
    }

    /// Empty list growing by `capacity_increment` slots at a time (minimum 1).
    #[must_use]
    pub const fn with_capacity_increment(capacity_increment: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity_increment: if capacity_increment == 0 {
                1
            } else {
                capacity_increment
            },
        }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// First item.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Last item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// All items in order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterate items in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Binary search with a probe comparing an item against the target.
    ///
    /// `Ok(index)` when found, `Err(index)` with the insertion point otherwise.
    ///
    /// # Errors
    /// `Err` carries the insertion index when no item compares equal.
    pub fn binary_search_by<F>(&self, probe: F) -> Result<usize, usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        self.items.binary_search_by(probe)
    }

    /// Insert `item` at `index`, shifting later items right.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, item: T) {
        self.grow_for(1);
        self.items.insert(index, item);
    }

    /// Insert a run of items at `index`, preserving their order. Returns the
    /// number inserted.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert_range<I>(&mut self, index: usize, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let items = items.into_iter();
        let count = items.len();
        self.grow_for(count);
        self.items.splice(index..index, items);
        count
    }

    /// Remove every item. Capacity is retained.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.items.len() + additional;
        if needed > self.items.capacity() {
            let rounded = needed.div_ceil(self.capacity_increment) * self.capacity_increment;
            self.items.reserve_exact(rounded - self.items.len());
        }
    }
}

impl<T> Index<usize> for ComparableList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a ComparableList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_sorted(list: &mut ComparableList<i32>, value: i32) {
        match list.binary_search_by(|v| v.cmp(&value)) {
            Ok(_) => {}
            Err(at) => list.insert(at, value),
        }
    }

    #[test]
    fn search_reports_insertion_point() {
        let mut list = ComparableList::new();
        for v in [5, 1, 9, 3] {
            insert_sorted(&mut list, v);
        }
        assert_eq!(list.as_slice(), &[1, 3, 5, 9]);
        assert_eq!(list.binary_search_by(|v| v.cmp(&5)), Ok(2));
        assert_eq!(list.binary_search_by(|v| v.cmp(&4)), Err(2));
        assert_eq!(list.binary_search_by(|v| v.cmp(&10)), Err(4));
    }

    #[test]
    fn insert_range_keeps_run_order() {
        let mut list = ComparableList::with_capacity_increment(4);
        list.insert(0, 1);
        list.insert(1, 10);
        let n = list.insert_range(1, [2, 3, 4, 5, 6]);
        assert_eq!(n, 5);
        assert_eq!(list.as_slice(), &[1, 2, 3, 4, 5, 6, 10]);
        assert!(list.as_slice().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn clear_empties() {
        let mut list = ComparableList::new();
        list.insert(0, 'a');
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
    }
}
