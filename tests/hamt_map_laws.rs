//! Property-based tests for `HamtMap`.
//!
//! This module verifies that `HamtMap` satisfies various laws and
//! invariants using proptest.

use hamtmap::HamtMap;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

// =============================================================================
// Strategy for generating test data
// =============================================================================

fn arbitrary_key() -> impl Strategy<Value = String> {
    "[a-z]{1,10}".prop_map(|s| s)
}

fn arbitrary_value() -> impl Strategy<Value = i32> {
    any::<i32>()
}

fn arbitrary_entry() -> impl Strategy<Value = (String, i32)> {
    (arbitrary_key(), arbitrary_value())
}

fn arbitrary_entries() -> impl Strategy<Value = Vec<(String, i32)>> {
    prop::collection::vec(arbitrary_entry(), 0..50)
}

// =============================================================================
// Round-Trip Law: map.insert(k, v).get(&k) == Some(&v)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_insert_law(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let inserted = map.insert(key.clone(), value);

        prop_assert_eq!(inserted.get(&key), Some(&value));
    }
}

// =============================================================================
// Shadowing Law: insert(k, v1) then insert(k, v2) reads as insert(k, v2)
// =============================================================================

proptest! {
    #[test]
    fn prop_shadowing_law(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value1 in arbitrary_value(),
        value2 in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        let twice = map.insert(key.clone(), value1).insert(key.clone(), value2);
        let once = map.insert(key.clone(), value2);

        prop_assert_eq!(twice.get(&key), Some(&value2));
        prop_assert_eq!(twice, once);
    }
}

// =============================================================================
// Other-Key Law: k1 != k2 => map.insert(k1, v).get(&k2) == map.get(&k2)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_insert_other_law(
        entries in arbitrary_entries(),
        key1 in arbitrary_key(),
        key2 in arbitrary_key(),
        value in arbitrary_value()
    ) {
        prop_assume!(key1 != key2);

        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let inserted = map.insert(key1, value);

        prop_assert_eq!(inserted.get(&key2), map.get(&key2));
    }
}

// =============================================================================
// Deletion Law: map.remove(&k).get(&k) == None, other keys unchanged
// =============================================================================

proptest! {
    #[test]
    fn prop_remove_get_law(
        entries in arbitrary_entries(),
        key in arbitrary_key()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let removed = map.remove(&key);

        prop_assert_eq!(removed.get(&key), None);

        for (other_key, value) in map.iter() {
            if *other_key != key {
                prop_assert_eq!(removed.get(other_key), Some(value));
            }
        }
    }
}

// =============================================================================
// Idempotent Deletion Law: map.remove(&k).remove(&k) == map.remove(&k)
// =============================================================================

proptest! {
    #[test]
    fn prop_remove_idempotent_law(
        entries in arbitrary_entries(),
        key in arbitrary_key()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        let once = map.remove(&key);
        let twice = once.remove(&key);

        prop_assert_eq!(once, twice);
    }
}

// =============================================================================
// Persistence Law: operations do not modify the original map
// =============================================================================

proptest! {
    #[test]
    fn prop_insert_preserves_original(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let snapshot: HashMap<String, i32> = map
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        let _ = map.insert(key, value);

        prop_assert_eq!(map.len(), snapshot.len());
        for (k, v) in &snapshot {
            prop_assert_eq!(map.get(k), Some(v));
        }
    }
}

proptest! {
    #[test]
    fn prop_remove_preserves_original(
        entries in arbitrary_entries(),
        key in arbitrary_key()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let snapshot: HashMap<String, i32> = map
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        let _ = map.remove(&key);

        prop_assert_eq!(map.len(), snapshot.len());
        for (k, v) in &snapshot {
            prop_assert_eq!(map.get(k), Some(v));
        }
    }
}

// =============================================================================
// Enumeration Completeness: iter() equals the model map
// =============================================================================

proptest! {
    #[test]
    fn prop_iter_matches_model(entries in arbitrary_entries()) {
        let map: HamtMap<String, i32> = entries.clone().into_iter().collect();

        // Build expected entries (last value for each key wins)
        let mut model = HashMap::new();
        for (key, value) in entries {
            model.insert(key, value);
        }

        prop_assert_eq!(map.len(), model.len());
        prop_assert_eq!(map.iter().count(), model.len());

        for (key, value) in map.iter() {
            prop_assert_eq!(model.get(key), Some(value));
        }
    }
}

proptest! {
    #[test]
    fn prop_iter_yields_no_duplicate_keys(entries in arbitrary_entries()) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        let keys: Vec<&String> = map.keys().collect();
        let unique: HashSet<&String> = keys.iter().copied().collect();

        prop_assert_eq!(keys.len(), unique.len());
    }
}

// =============================================================================
// Length Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_length_law_insert_new(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        if map.contains_key(&key) {
            prop_assert_eq!(map.insert(key, value).len(), map.len());
        } else {
            prop_assert_eq!(map.insert(key, value).len(), map.len() + 1);
        }
    }
}

proptest! {
    #[test]
    fn prop_length_law_remove(
        entries in arbitrary_entries(),
        key in arbitrary_key()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        if map.contains_key(&key) {
            prop_assert_eq!(map.remove(&key).len(), map.len() - 1);
        } else {
            prop_assert_eq!(map.remove(&key).len(), map.len());
        }
    }
}

// =============================================================================
// Remove-Insert Law: !map.contains_key(&k) => map.insert(k, v).remove(&k) == map
// =============================================================================

proptest! {
    #[test]
    fn prop_remove_insert_law(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        if !map.contains_key(&key) {
            let inserted_then_removed = map.insert(key.clone(), value).remove(&key);

            prop_assert_eq!(inserted_then_removed, map);
        }
    }
}

// =============================================================================
// map_values Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_map_values_preserves_keys_and_length(entries in arbitrary_entries()) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();
        let transformed = map.map_values(|_, value| i64::from(*value) + 1);

        prop_assert_eq!(transformed.len(), map.len());
        for (key, value) in map.iter() {
            prop_assert_eq!(transformed.get(key), Some(&(i64::from(*value) + 1)));
        }
    }
}

// =============================================================================
// update_with Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_update_with_none_equals_remove(
        entries in arbitrary_entries(),
        key in arbitrary_key()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        prop_assert_eq!(map.update_with(&key, |_| None), map.remove(&key));
    }
}

proptest! {
    #[test]
    fn prop_update_with_some_equals_insert(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        prop_assert_eq!(
            map.update_with(&key, |_| Some(value)),
            map.insert(key.clone(), value)
        );
    }
}

// =============================================================================
// Equality Laws
// =============================================================================

proptest! {
    #[test]
    fn prop_equality_reflexive(entries in arbitrary_entries()) {
        let map: HamtMap<String, i32> = entries.into_iter().collect();

        prop_assert_eq!(map.clone(), map);
    }
}

proptest! {
    #[test]
    fn prop_equality_symmetric(
        entries1 in arbitrary_entries(),
        entries2 in arbitrary_entries()
    ) {
        let map1: HamtMap<String, i32> = entries1.into_iter().collect();
        let map2: HamtMap<String, i32> = entries2.into_iter().collect();

        prop_assert_eq!(map1 == map2, map2 == map1);
    }
}
