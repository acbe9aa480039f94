//! Ordered insertion into an already-sorted `Vec`.
//!
//! Used for distance ordering of buckets and score ordering of candidates.
//! Equal elements keep insertion order, so iteration order is reproducible.

use std::cmp::Ordering;

/// Insert `item` after every element that does not compare `Greater` than it.
///
/// Returns the index the item landed at.
pub fn ordered_insert<T, F>(items: &mut Vec<T>, item: T, mut cmp: F) -> usize
where
    F: FnMut(&T, &T) -> Ordering,
{
    let at = items.partition_point(|probe| cmp(probe, &item) != Ordering::Greater);
    items.insert(at, item);
    at
}

/// [`ordered_insert`] keyed by a float, ascending. NaN keys sort last.
pub fn insert_by_key<T, F>(items: &mut Vec<T>, item: T, mut key: F) -> usize
where
    F: FnMut(&T) -> f64,
{
    ordered_insert(items, item, |a, b| key(a).total_cmp(&key(b)))
}
