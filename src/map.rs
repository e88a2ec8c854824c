//! The public persistent map handle.
//!
//! [`HamtMap`] wraps one shared root node plus an O(1) length and the
//! hash builder every operation feeds keys through. "Mutation" always
//! produces a new handle; the old one keeps observing the tree it
//! pointed at, sharing every subtree off the write path.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;

use arrayvec::ArrayVec;

use crate::bits::MAX_TRIE_DEPTH;
use crate::node::{Node, Removed, hash_key};
use crate::{DefaultHashBuilder, ReferenceCounter};

// =============================================================================
// HamtMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on a hash array mapped trie.
///
/// Every operation that "modifies" the map returns a new map value and
/// leaves the original untouched; the two versions share all subtrees
/// the operation did not copy. Divergent versions derived from the same
/// base simply coexist as distinct values.
///
/// The map is generic over its hash builder `S`, defaulting to
/// [`DefaultHashBuilder`](crate::DefaultHashBuilder). Any `BuildHasher`
/// works; a badly distributed one degrades depth and speed, never
/// correctness.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `get`          | O(log32 N)        |
/// | `insert`       | O(log32 N)        |
/// | `remove`       | O(log32 N)        |
/// | `map_values`   | O(N)              |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
///
/// # Examples
///
/// ```rust
/// use hamtmap::HamtMap;
///
/// let map = HamtMap::singleton("key".to_string(), 42);
/// assert_eq!(map.get("key"), Some(&42));
/// ```
pub struct HamtMap<K, V, S = DefaultHashBuilder> {
    /// Root node of the trie, at hash depth 0.
    root: ReferenceCounter<Node<K, V>>,
    /// Number of entries.
    length: usize,
    /// Hash builder shared by every version derived from this map.
    hasher: S,
}

impl<K, V, S: Clone> Clone for HamtMap<K, V, S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V> HamtMap<K, V> {
    /// Creates a new empty map using the default hash builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map: HamtMap<String, i32> = HamtMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K: Clone + Hash + Eq, V: Clone> HamtMap<K, V> {
    /// Creates a map containing a single key-value pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self {
        Self::new().insert(key, value)
    }
}

impl<K, V, S> HamtMap<K, V, S> {
    /// Creates a new empty map using the given hash builder.
    ///
    /// Every map derived from this one keeps using the same builder, so
    /// a whole version family hashes keys identically.
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            root: ReferenceCounter::new(Node::empty()),
            length: 0,
            hasher,
        }
    }

    /// Returns the number of entries in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// assert_eq!(map.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let empty: HamtMap<String, i32> = HamtMap::new();
    /// assert!(empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns a reference to the map's hash builder.
    #[inline]
    #[must_use]
    pub const fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns a lazy iterator over key-value pairs.
    ///
    /// The traversal is depth-first: a node's direct entries first, then
    /// each child subtree in slot order. It walks the structure as it
    /// goes — nothing is collected up front — and a fresh traversal can
    /// always be started from the same handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let total: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(total, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> HamtMapIterator<'_, K, V> {
        HamtMapIterator::new(&self.root, self.length)
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Clone + Hash + Eq, V: Clone, S: BuildHasher + Clone> HamtMap<K, V, S> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but
    /// `Hash` and `Eq` on the borrowed form must match those for the key
    /// type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(&self.hasher, key);
        self.root.get(key, hash, 0)
    }

    /// Returns `true` if the map contains a value for the specified key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new().insert("key".to_string(), 42);
    ///
    /// assert!(map.contains_key("key"));
    /// assert!(!map.contains_key("other"));
    /// ```
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair, returning the new map.
    ///
    /// If the map already contains the key, the value is replaced.
    /// Only the nodes on the path to the slot are copied; everything
    /// else is shared with `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map1 = HamtMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_key(&self.hasher, &key);
        let (root, added) = self.root.insert(&self.hasher, key, value, hash, 0);
        Self {
            root: ReferenceCounter::new(root),
            length: if added { self.length + 1 } else { self.length },
            hasher: self.hasher.clone(),
        }
    }

    /// Removes a key, returning the new map.
    ///
    /// Removing the second-to-last occupant of a subtree collapses that
    /// subtree into the surviving pair, so the trie never keeps interior
    /// nodes around for a single entry. If the key doesn't exist the
    /// result is an unchanged clone of `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let removed = map.remove("a");
    ///
    /// assert_eq!(map.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert_eq!(removed.get("a"), None);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(&self.hasher, key);
        match self.root.remove(key, hash, 0) {
            Removed::Unchanged => self.clone(),
            Removed::Updated(root) => Self {
                root: ReferenceCounter::new(root),
                length: self.length - 1,
                hasher: self.hasher.clone(),
            },
            // No parent exists above the root to absorb the survivor:
            // restart from empty and re-insert it.
            Removed::Collapsed((key, value)) => {
                Self::with_hasher(self.hasher.clone()).insert(key, value)
            }
        }
    }

    /// Updates, inserts, or removes a value for a key using an updater
    /// function.
    ///
    /// The updater receives `Some(&V)` if the key exists, or `None` if
    /// it doesn't. If it returns `Some(V)`, the value is inserted or
    /// updated — except that returning a value equal to the existing one
    /// yields the unchanged map, with no tree rebuilt. If it returns
    /// `None`, the key is removed (if it exists).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new().insert("count".to_string(), 10);
    ///
    /// // Increment existing value
    /// let updated = map.update_with("count", |value| value.map(|v| v + 1));
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// // Insert if not exists
    /// let inserted = map.update_with("fresh", |value| match value {
    ///     Some(existing) => Some(*existing),
    ///     None => Some(100),
    /// });
    /// assert_eq!(inserted.get("fresh"), Some(&100));
    ///
    /// // Remove by returning None
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
        V: PartialEq,
    {
        let current = self.get(key);
        let fresh = updater(current);

        match (current, fresh) {
            (Some(existing), Some(value)) => {
                if *existing == value {
                    // Writing back an equal value: keep the whole tree.
                    self.clone()
                } else {
                    self.insert(key.to_owned(), value)
                }
            }
            (Some(_), None) => self.remove(key),
            (None, Some(value)) => self.insert(key.to_owned(), value),
            (None, None) => self.clone(),
        }
    }

    /// Rebuilds the map with every value replaced by
    /// `function(&key, &value)`, preserving keys and trie shape exactly.
    ///
    /// Touches each node once, which is always cheaper than calling
    /// [`insert`](Self::insert) per key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map = HamtMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let doubled = map.map_values(|_, value| value * 2);
    ///
    /// assert_eq!(doubled.get("a"), Some(&2));
    /// assert_eq!(doubled.get("b"), Some(&4));
    /// assert_eq!(map.get("a"), Some(&1)); // Original unchanged
    /// ```
    #[must_use]
    pub fn map_values<W, F>(&self, mut function: F) -> HamtMap<K, W, S>
    where
        F: FnMut(&K, &V) -> W,
    {
        HamtMap {
            root: ReferenceCounter::new(self.root.map_values(&mut function)),
            length: self.length,
            hasher: self.hasher.clone(),
        }
    }

    /// Merges two maps, with values from `other` taking precedence on
    /// key conflicts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hamtmap::HamtMap;
    ///
    /// let map1 = HamtMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    /// let map2 = HamtMap::new()
    ///     .insert("b".to_string(), 20)
    ///     .insert("c".to_string(), 3);
    ///
    /// let merged = map1.merge(&map2);
    ///
    /// assert_eq!(merged.get("a"), Some(&1));
    /// assert_eq!(merged.get("b"), Some(&20)); // From map2
    /// assert_eq!(merged.get("c"), Some(&3));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in other {
            merged = merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// One level of the depth-first traversal.
struct Frame<'a, K, V> {
    node: &'a Node<K, V>,
    entry_cursor: usize,
    child_cursor: usize,
}

impl<'a, K, V> Frame<'a, K, V> {
    const fn new(node: &'a Node<K, V>) -> Self {
        Self {
            node,
            entry_cursor: 0,
            child_cursor: 0,
        }
    }
}

/// A lazy iterator over key-value pairs of a [`HamtMap`].
///
/// The frame stack is bounded by the trie's fixed depth, so the iterator
/// never allocates.
pub struct HamtMapIterator<'a, K, V> {
    stack: ArrayVec<Frame<'a, K, V>, MAX_TRIE_DEPTH>,
    remaining: usize,
}

impl<'a, K, V> HamtMapIterator<'a, K, V> {
    fn new(root: &'a Node<K, V>, length: usize) -> Self {
        let mut stack = ArrayVec::new();
        stack.push(Frame::new(root));
        Self {
            stack,
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for HamtMapIterator<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let (entries, children): (&'a [(K, V)], &'a [ReferenceCounter<Node<K, V>>]) =
                match frame.node {
                    Node::Branch {
                        children, entries, ..
                    } => (entries.as_slice(), children.as_slice()),
                    Node::Bucket { entries } => (entries.as_slice(), &[]),
                };

            if frame.entry_cursor < entries.len() {
                let (key, value) = &entries[frame.entry_cursor];
                frame.entry_cursor += 1;
                self.remaining -= 1;
                return Some((key, value));
            }

            if frame.child_cursor < children.len() {
                let child: &'a Node<K, V> = &children[frame.child_cursor];
                frame.child_cursor += 1;
                self.stack.push(Frame::new(child));
                continue;
            }

            self.stack.pop();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for HamtMapIterator<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for HamtMapIterator<'_, K, V> {}

/// An owning iterator over key-value pairs of a [`HamtMap`].
pub struct HamtMapIntoIterator<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> Iterator for HamtMapIntoIterator<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for HamtMapIntoIterator<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> FusedIterator for HamtMapIntoIterator<K, V> {}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, S: Default> Default for HamtMap<K, V, S> {
    #[inline]
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> FromIterator<(K, V)> for HamtMap<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone,
    S: BuildHasher + Default + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        for (key, value) in iter {
            map = map.insert(key, value);
        }
        map
    }
}

impl<K: Clone, V: Clone, S> IntoIterator for HamtMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = HamtMapIntoIterator<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        let entries: Vec<(K, V)> = self
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        HamtMapIntoIterator {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a HamtMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = HamtMapIterator<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> PartialEq for HamtMap<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone + PartialEq,
    S: BuildHasher + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K, V, S> Eq for HamtMap<K, V, S>
where
    K: Clone + Hash + Eq,
    V: Clone + Eq,
    S: BuildHasher + Clone,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HamtMap<K, V, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Serde Implementations
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, S> serde::Serialize for HamtMap<K, V, S>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct HamtMapVisitor<K, V, S> {
    marker: std::marker::PhantomData<(K, V, S)>,
}

#[cfg(feature = "serde")]
impl<K, V, S> HamtMapVisitor<K, V, S> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, S> serde::de::Visitor<'de> for HamtMapVisitor<K, V, S>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
    S: BuildHasher + Default + Clone,
{
    type Value = HamtMap<K, V, S>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // Sequential insert keeps memory growth gradual for large inputs.
        let mut map = HamtMap::with_hasher(S::default());
        while let Some((key, value)) = access.next_entry()? {
            map = map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, S> serde::Deserialize<'de> for HamtMap<K, V, S>
where
    K: serde::Deserialize<'de> + Clone + Hash + Eq,
    V: serde::Deserialize<'de> + Clone,
    S: BuildHasher + Default + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(HamtMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serde_round_trip() {
        let map: HamtMap<String, i32> = [("a".to_string(), 1), ("b".to_string(), 2)]
            .into_iter()
            .collect();

        let serialized = serde_json::to_string(&map).expect("serialization should succeed");
        let deserialized: HamtMap<String, i32> =
            serde_json::from_str(&serialized).expect("deserialization should succeed");

        assert_eq!(deserialized, map);
    }
}
