//! Bit arithmetic for the bitmap-indexed trie.
//!
//! A branch node represents 32 logical slots with a `u32` bitmap and a
//! dense sequence: bit *i* set means slot *i* is populated, and the
//! element's position in the sequence is the number of set bits below
//! bit *i*. The two functions here convert a hash chunk into a slot bit
//! and a slot bit into a dense position.

use static_assertions::const_assert;

/// Branching factor of the trie (2^5 = 32).
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Hash bits consumed per trie level.
pub(crate) const BITS_PER_LEVEL: u32 = 5;

/// Total width of a key hash.
pub(crate) const HASH_BITS: u32 = 32;

/// Bit mask extracting one level's chunk of the hash.
const LEVEL_MASK: u32 = (BRANCHING_FACTOR - 1) as u32;

/// Number of branch levels before the bucket level takes over.
pub(crate) const BRANCH_LEVELS: u32 = HASH_BITS.div_ceil(BITS_PER_LEVEL);

/// Upper bound on traversal frames: every branch level plus the bucket.
pub(crate) const MAX_TRIE_DEPTH: usize = BRANCH_LEVELS as usize + 1;

// The branch levels must consume the whole hash before the bucket level,
// and the deepest branch level must still have hash bits left to look at.
const_assert!(BRANCH_LEVELS * BITS_PER_LEVEL >= HASH_BITS);
const_assert!((BRANCH_LEVELS - 1) * BITS_PER_LEVEL < HASH_BITS);

/// Extracts the 5-bit chunk of `hash` starting at bit `depth` and returns
/// it as a single set bit (`1 << chunk`).
#[inline]
pub(crate) const fn selector_bit(hash: u32, depth: u32) -> u32 {
    1 << ((hash >> depth) & LEVEL_MASK)
}

/// Position of `bit`'s slot within the dense sequence for `bitmap`.
///
/// Counts the populated slots strictly below `bit`, so the result is
/// valid both for locating an existing slot and for choosing the
/// insertion point of a slot about to be set.
#[inline]
pub(crate) const fn dense_index(bit: u32, bitmap: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Tests
// =============================================================================
