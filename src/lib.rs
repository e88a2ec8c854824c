//! # hamtmap
//!
//! A persistent (immutable) hash map based on a Hash Array Mapped Trie
//! (HAMT) with structural sharing.
//!
//! ## Overview
//!
//! [`HamtMap`] is an immutable associative container: every "mutating"
//! operation returns a new map and leaves the original untouched. New
//! versions share all unmodified subtrees with their ancestors, so an
//! update copies only the O(log32 N) nodes on the path from the root to
//! the changed slot.
//!
//! Internally the trie branches 32 ways per level, consuming 5 bits of
//! the key's hash at a time. Each branch node keeps two disjoint bitmaps
//! over its 32 slots: one for child subtrees and one for directly stored
//! key-value pairs, with both backed by dense bitmap-indexed sequences.
//! Keys whose hashes collide in full are resolved by a terminal bucket
//! level.
//!
//! ```rust
//! use hamtmap::HamtMap;
//!
//! let map = HamtMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));       // Original unchanged
//! assert_eq!(updated.get("one"), Some(&100)); // New version
//! ```
//!
//! ## Feature Flags
//!
//! - `arc`: share nodes via `Arc` instead of `Rc`, making maps `Send`/`Sync`
//! - `serde`: `Serialize`/`Deserialize` implementations
//! - `fxhash`: use `rustc-hash` for the default hash builder
//! - `ahash`: use `ahash` for the default hash builder

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

// =============================================================================
// Default Hash Builder
// =============================================================================

/// The hash builder used by [`HamtMap`] when none is supplied.
///
/// `ahash::RandomState` under the `ahash` feature.
#[cfg(feature = "ahash")]
pub type DefaultHashBuilder = ahash::RandomState;

/// The hash builder used by [`HamtMap`] when none is supplied.
///
/// `rustc_hash::FxBuildHasher` under the `fxhash` feature.
#[cfg(all(feature = "fxhash", not(feature = "ahash")))]
pub type DefaultHashBuilder = rustc_hash::FxBuildHasher;

/// The hash builder used by [`HamtMap`] when none is supplied.
///
/// The standard library's SipHash-based `RandomState` by default;
/// the `fxhash` and `ahash` features swap in faster, non-DoS-resistant
/// hash functions.
#[cfg(not(any(feature = "ahash", feature = "fxhash")))]
pub type DefaultHashBuilder = std::collections::hash_map::RandomState;

mod array;
mod bits;
mod map;
mod node;

pub use map::HamtMap;
pub use map::HamtMapIntoIterator;
pub use map::HamtMapIterator;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_clone() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(*reference_counter, *reference_counter_clone);
    }

    #[rstest]
    fn test_reference_counter_strong_count() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 2);
        drop(reference_counter_clone);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
    }
}
