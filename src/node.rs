//! Trie nodes for the hash array mapped trie.
//!
//! A [`Node`] is either a `Branch` — one 32-way level of the trie — or a
//! `Bucket`, the terminal level reached once all 32 hash bits have been
//! consumed. A branch keeps two disjoint bitmaps over its 32 selector
//! slots: a slot is a child subtree, a directly stored pair, or empty,
//! never more than one of these. Children and pairs live in dense
//! sequences ordered by ascending (unsigned) selector value.
//!
//! Nodes are immutable once shared: every write builds fresh nodes for
//! the path it touches and leaves everything else aliased. Removal
//! reports its outcome through the three-way [`Removed`] contract so
//! that parents can absorb a child that has decayed to a single pair.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};

use smallvec::{SmallVec, smallvec};

use crate::ReferenceCounter;
use crate::array::{insert_at, remove_at, replace_at};
use crate::bits::{BITS_PER_LEVEL, HASH_BITS, dense_index, selector_bit};

/// Inline capacity for a branch node's child pointers.
const CHILD_INLINE: usize = 2;

/// Inline capacity for a node's key-value pairs.
const ENTRY_INLINE: usize = 2;

pub(crate) type ChildSequence<K, V> = SmallVec<[ReferenceCounter<Node<K, V>>; CHILD_INLINE]>;
pub(crate) type EntrySequence<K, V> = SmallVec<[(K, V); ENTRY_INLINE]>;

/// Computes a key's 32-bit trie hash.
///
/// The trie consumes exactly 32 bits, 5 per branch level, so the
/// 64-bit hasher output is truncated to the low word.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn hash_key<K, S>(hasher: &S, key: &K) -> u32
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    hasher.hash_one(key) as u32
}

/// One node of the trie.
pub(crate) enum Node<K, V> {
    /// A 32-way branch over one 5-bit hash chunk.
    ///
    /// Invariant: `children_bitmap & entries_bitmap == 0`, and each dense
    /// sequence's length equals its bitmap's popcount.
    Branch {
        /// Bit *i* set ⇔ selector value *i* leads to a child subtree.
        children_bitmap: u32,
        /// Bit *i* set ⇔ selector value *i* holds a stored pair.
        entries_bitmap: u32,
        /// Child subtrees, dense, ordered by ascending selector value.
        children: ChildSequence<K, V>,
        /// Stored pairs, dense, ordered by ascending selector value.
        entries: EntrySequence<K, V>,
    },
    /// Terminal level: the full hash is spent, remaining collisions are
    /// resolved by linear scan over an unordered sequence.
    Bucket {
        /// Pairs whose keys share one full 32-bit hash.
        entries: EntrySequence<K, V>,
    },
}

impl<K, V> Node<K, V> {
    /// The root of an empty map: a branch with both bitmaps zero.
    pub(crate) fn empty() -> Self {
        Self::Branch {
            children_bitmap: 0,
            entries_bitmap: 0,
            children: SmallVec::new(),
            entries: SmallVec::new(),
        }
    }
}

/// Outcome of a removal, propagated explicitly up the recursion.
pub(crate) enum Removed<K, V> {
    /// The key was absent; nothing changed anywhere.
    Unchanged,
    /// The pair was removed; this node replaces the old one.
    Updated(Node<K, V>),
    /// The node decayed to exactly one pair and dissolves; the parent
    /// absorbs the pair as a direct entry (the map handle does this for
    /// the root, which has no parent).
    Collapsed((K, V)),
}

impl<K: Clone + Hash + Eq, V: Clone> Node<K, V> {
    /// Looks up `key` under this node. `depth` is the bit offset of this
    /// node's hash chunk.
    pub(crate) fn get<'a, Q>(&'a self, key: &Q, hash: u32, depth: u32) -> Option<&'a V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Self::Branch {
                children_bitmap,
                entries_bitmap,
                children,
                entries,
            } => {
                let bit = selector_bit(hash, depth);
                if bit & children_bitmap != 0 {
                    let index = dense_index(bit, *children_bitmap);
                    children[index].get(key, hash, depth + BITS_PER_LEVEL)
                } else if bit & entries_bitmap != 0 {
                    let (stored_key, value) = &entries[dense_index(bit, *entries_bitmap)];
                    (stored_key.borrow() == key).then_some(value)
                } else {
                    None
                }
            }
            Self::Bucket { entries } => entries
                .iter()
                .find(|(stored_key, _)| stored_key.borrow() == key)
                .map(|(_, value)| value),
        }
    }

    /// Associates `key` with `value` under this node, path-copying the
    /// nodes it touches.
    ///
    /// Returns the replacement node and whether a new pair was added
    /// (as opposed to an existing one being overwritten).
    pub(crate) fn insert<S: BuildHasher>(
        &self,
        hasher: &S,
        key: K,
        value: V,
        hash: u32,
        depth: u32,
    ) -> (Self, bool) {
        match self {
            Self::Branch {
                children_bitmap,
                entries_bitmap,
                children,
                entries,
            } => {
                let bit = selector_bit(hash, depth);
                if bit & children_bitmap != 0 {
                    let index = dense_index(bit, *children_bitmap);
                    let (child, added) =
                        children[index].insert(hasher, key, value, hash, depth + BITS_PER_LEVEL);
                    (
                        Self::Branch {
                            children_bitmap: *children_bitmap,
                            entries_bitmap: *entries_bitmap,
                            children: replace_at(children, index, ReferenceCounter::new(child)),
                            entries: entries.clone(),
                        },
                        added,
                    )
                } else if bit & entries_bitmap != 0 {
                    let index = dense_index(bit, *entries_bitmap);
                    let (stored_key, stored_value) = &entries[index];
                    if *stored_key == key {
                        // Same key: pure value replacement, no shape change.
                        (
                            Self::Branch {
                                children_bitmap: *children_bitmap,
                                entries_bitmap: *entries_bitmap,
                                children: children.clone(),
                                entries: replace_at(entries, index, (key, value)),
                            },
                            false,
                        )
                    } else {
                        // Chunk collision with a different key: demote the
                        // stored pair one level down, joined with the new one.
                        let stored_hash = hash_key(hasher, stored_key);
                        let child = Self::join(
                            stored_key.clone(),
                            stored_value.clone(),
                            stored_hash,
                            key,
                            value,
                            hash,
                            depth + BITS_PER_LEVEL,
                        );
                        (
                            Self::Branch {
                                children_bitmap: children_bitmap | bit,
                                entries_bitmap: entries_bitmap & !bit,
                                children: insert_at(
                                    children,
                                    dense_index(bit, *children_bitmap),
                                    ReferenceCounter::new(child),
                                ),
                                entries: remove_at(entries, index),
                            },
                            true,
                        )
                    }
                } else {
                    // Vacant slot. `dense_index` only counts bits below
                    // `bit`, so computing it against the pre-insert bitmap
                    // is equivalent to computing it after the bit is set.
                    (
                        Self::Branch {
                            children_bitmap: *children_bitmap,
                            entries_bitmap: entries_bitmap | bit,
                            children: children.clone(),
                            entries: insert_at(
                                entries,
                                dense_index(bit, *entries_bitmap),
                                (key, value),
                            ),
                        },
                        true,
                    )
                }
            }
            Self::Bucket { entries } => {
                match entries.iter().position(|(stored_key, _)| *stored_key == key) {
                    Some(index) => (
                        Self::Bucket {
                            entries: replace_at(entries, index, (key, value)),
                        },
                        false,
                    ),
                    None => (
                        Self::Bucket {
                            entries: insert_at(entries, entries.len(), (key, value)),
                        },
                        true,
                    ),
                }
            }
        }
    }

    /// Builds the smallest subtree holding two pairs whose hashes agree
    /// on every chunk above `depth`.
    ///
    /// While the selector bits still coincide the subtree is a chain of
    /// single-child branches; once they diverge the two pairs become
    /// direct entries, ordered by ascending bit value (the `u32` bitmaps
    /// make the comparison unsigned, so slot 31 sorts last). If the
    /// hashes agree in full, the chain bottoms out in a bucket.
    fn join(
        first_key: K,
        first_value: V,
        first_hash: u32,
        second_key: K,
        second_value: V,
        second_hash: u32,
        depth: u32,
    ) -> Self {
        if depth >= HASH_BITS {
            return Self::Bucket {
                entries: smallvec![(first_key, first_value), (second_key, second_value)],
            };
        }

        let first_bit = selector_bit(first_hash, depth);
        let second_bit = selector_bit(second_hash, depth);

        if first_bit == second_bit {
            let child = Self::join(
                first_key,
                first_value,
                first_hash,
                second_key,
                second_value,
                second_hash,
                depth + BITS_PER_LEVEL,
            );
            Self::Branch {
                children_bitmap: first_bit,
                entries_bitmap: 0,
                children: smallvec![ReferenceCounter::new(child)],
                entries: SmallVec::new(),
            }
        } else {
            let entries = if first_bit < second_bit {
                smallvec![(first_key, first_value), (second_key, second_value)]
            } else {
                smallvec![(second_key, second_value), (first_key, first_value)]
            };
            Self::Branch {
                children_bitmap: 0,
                entries_bitmap: first_bit | second_bit,
                children: SmallVec::new(),
                entries,
            }
        }
    }

    /// Removes `key` under this node, reporting the outcome through the
    /// three-way [`Removed`] contract.
    pub(crate) fn remove<Q>(&self, key: &Q, hash: u32, depth: u32) -> Removed<K, V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self {
            Self::Branch {
                children_bitmap,
                entries_bitmap,
                children,
                entries,
            } => {
                let bit = selector_bit(hash, depth);
                if bit & children_bitmap != 0 {
                    let index = dense_index(bit, *children_bitmap);
                    match children[index].remove(key, hash, depth + BITS_PER_LEVEL) {
                        Removed::Unchanged => Removed::Unchanged,
                        Removed::Updated(child) => Removed::Updated(Self::Branch {
                            children_bitmap: *children_bitmap,
                            entries_bitmap: *entries_bitmap,
                            children: replace_at(children, index, ReferenceCounter::new(child)),
                            entries: entries.clone(),
                        }),
                        Removed::Collapsed(pair) => {
                            if children.len() == 1 && entries.is_empty() {
                                // Nothing else lives here: dissolve too and
                                // let an ancestor absorb the pair.
                                Removed::Collapsed(pair)
                            } else {
                                // Absorb the surviving pair as a direct
                                // entry of this node.
                                Removed::Updated(Self::Branch {
                                    children_bitmap: children_bitmap & !bit,
                                    entries_bitmap: entries_bitmap | bit,
                                    children: remove_at(children, index),
                                    entries: insert_at(
                                        entries,
                                        dense_index(bit, *entries_bitmap),
                                        pair,
                                    ),
                                })
                            }
                        }
                    }
                } else if bit & entries_bitmap != 0 {
                    let index = dense_index(bit, *entries_bitmap);
                    if entries[index].0.borrow() != key {
                        // Same chunk, different key: the key is certainly
                        // absent, since entries and children partition the
                        // slots exactly.
                        return Removed::Unchanged;
                    }
                    if entries.len() == 2 && children.is_empty() {
                        // Exactly one pair survives and nothing else:
                        // replace this node with the pair itself.
                        Removed::Collapsed(entries[1 - index].clone())
                    } else {
                        Removed::Updated(Self::Branch {
                            children_bitmap: *children_bitmap,
                            entries_bitmap: entries_bitmap & !bit,
                            children: children.clone(),
                            entries: remove_at(entries, index),
                        })
                    }
                } else {
                    Removed::Unchanged
                }
            }
            Self::Bucket { entries } => {
                let Some(index) = entries
                    .iter()
                    .position(|(stored_key, _)| stored_key.borrow() == key)
                else {
                    return Removed::Unchanged;
                };
                if entries.len() == 2 {
                    Removed::Collapsed(entries[1 - index].clone())
                } else {
                    Removed::Updated(Self::Bucket {
                        entries: remove_at(entries, index),
                    })
                }
            }
        }
    }

    /// Rebuilds the whole subtree with every stored value replaced by
    /// `function(&key, &value)`, preserving keys, bitmaps, and shape.
    pub(crate) fn map_values<W, F>(&self, function: &mut F) -> Node<K, W>
    where
        F: FnMut(&K, &V) -> W,
    {
        match self {
            Self::Branch {
                children_bitmap,
                entries_bitmap,
                children,
                entries,
            } => Node::Branch {
                children_bitmap: *children_bitmap,
                entries_bitmap: *entries_bitmap,
                children: children
                    .iter()
                    .map(|child| ReferenceCounter::new(child.map_values(function)))
                    .collect(),
                entries: entries
                    .iter()
                    .map(|(key, value)| (key.clone(), function(key, value)))
                    .collect(),
            },
            Self::Bucket { entries } => Node::Bucket {
                entries: entries
                    .iter()
                    .map(|(key, value)| (key.clone(), function(key, value)))
                    .collect(),
            },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
