//! Copy-based helpers for the trie nodes' inline sequences.
//!
//! Every helper leaves its input untouched and returns a freshly built
//! sequence. Trie nodes are only reachable through shared pointers and
//! never hand out mutable access to a stored sequence, so all structural
//! edits go through these.

use smallvec::{Array, SmallVec};

/// Returns a copy of `items` with `item` inserted at `index`.
pub(crate) fn insert_at<A: Array>(
    items: &SmallVec<A>,
    index: usize,
    item: A::Item,
) -> SmallVec<A>
where
    A::Item: Clone,
{
    let mut fresh = SmallVec::with_capacity(items.len() + 1);
    fresh.extend(items[..index].iter().cloned());
    fresh.push(item);
    fresh.extend(items[index..].iter().cloned());
    fresh
}

/// Returns a copy of `items` with the element at `index` removed.
pub(crate) fn remove_at<A: Array>(items: &SmallVec<A>, index: usize) -> SmallVec<A>
where
    A::Item: Clone,
{
    let mut fresh = SmallVec::with_capacity(items.len() - 1);
    fresh.extend(items[..index].iter().cloned());
    fresh.extend(items[index + 1..].iter().cloned());
    fresh
}

/// Returns a copy of `items` with the element at `index` replaced by `item`.
pub(crate) fn replace_at<A: Array>(
    items: &SmallVec<A>,
    index: usize,
    item: A::Item,
) -> SmallVec<A>
where
    A::Item: Clone,
{
    let mut fresh = items.clone();
    fresh[index] = item;
    fresh
}

// =============================================================================
// Tests
// =============================================================================
