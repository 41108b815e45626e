//! Merging of overlapping query results.

use std::collections::HashSet;

/// Keep the first item for each key, then sort ascending by that key.
///
/// Keys compare with `Ord` on `String`, so ordering is case-sensitive and
/// byte-lexicographic.
pub(crate) fn dedupe_sorted_by_key<T, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(key(item).to_string()))
        .collect();
    kept.sort_by(|left, right| key(left).cmp(key(right)));
    kept
}
