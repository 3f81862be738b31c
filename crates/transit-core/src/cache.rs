//! Session-scoped keyed cache.
//!
//! Entries are created on first access and then only grow by merging newly
//! fetched data into them. Nothing is ever evicted: the cache lives as long
//! as the session that created it.

use std::collections::HashMap;
use std::hash::Hash;

/// Values that can absorb newer data for the same key.
pub trait Merge {
    /// Fold `newer` into `self`.
    fn merge(&mut self, newer: Self);
}

/// Map from keys to mergeable values.
#[derive(Debug, Clone)]
pub struct SessionCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for SessionCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V: Merge> SessionCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert `value`, or merge it into the existing entry for `key`.
    pub fn merge(&mut self, key: K, value: V) -> &mut V {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.merge(value);
                existing
            }
            std::collections::hash_map::Entry::Vacant(entry) => entry.insert(value),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
