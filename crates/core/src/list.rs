//! Small collection helpers.

use std::hash::Hash;

use indexmap::IndexSet;

/// Whether `item` occurs in `list`.
pub fn has<T: PartialEq>(item: &T, list: &[T]) -> bool {
    list.iter().any(|candidate| candidate == item)
}

/// Apply `f` to every element of `list`, preserving order.
pub fn map<T, R>(list: &[T], f: impl FnMut(&T) -> R) -> Vec<R> {
    list.iter().map(f).collect()
}

/// Remove duplicates, keeping the first occurrence of each value.
pub fn dedup<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    items.into_iter().collect::<IndexSet<T>>().into_iter().collect()
}
