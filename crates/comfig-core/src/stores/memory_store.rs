//! In-memory key-value store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{Store, StringMap};

#[derive(Debug, Default, Clone)]
struct Spaces {
    scalars: HashMap<String, String>,
    maps: HashMap<String, StringMap>,
    arrays: HashMap<String, Vec<String>>,
}

/// In-memory store for tests, defaults and static configuration
///
/// Holds three disjoint key spaces: a key set with [`MemoryStore::set`] is
/// invisible to [`Store::get_map`] and [`Store::get_array`], and vice versa.
/// Nothing is evicted or expired; the store returns exactly what its owner
/// put in.
///
/// # Thread Safety
///
/// The store uses a `RwLock` internally so it can be populated through a
/// shared `Arc` before (or after) it is registered with a gateway.
///
/// # Example
///
/// ```
/// use comfig_core::stores::{Store, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("region", "eu-west-1");
/// store.set_array("zones", vec!["a".to_string(), "b".to_string()]);
///
/// assert_eq!(store.get("region"), Some("eu-west-1".to_string()));
/// assert_eq!(store.get("zones"), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    spaces: RwLock<Spaces>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store with initial scalar values
    pub fn with_values(initial: HashMap<String, String>) -> Self {
        Self {
            spaces: RwLock::new(Spaces {
                scalars: initial,
                ..Spaces::default()
            }),
        }
    }

    /// Set a scalar value
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.spaces.write().scalars.insert(key.into(), value.into());
    }

    /// Set a map value
    pub fn set_map(&self, key: impl Into<String>, value: StringMap) {
        self.spaces.write().maps.insert(key.into(), value);
    }

    /// Set an array value
    pub fn set_array(&self, key: impl Into<String>, value: Vec<String>) {
        self.spaces.write().arrays.insert(key.into(), value);
    }

    /// Remove a key from all three key spaces
    pub fn remove(&self, key: &str) {
        let mut spaces = self.spaces.write();
        spaces.scalars.remove(key);
        spaces.maps.remove(key);
        spaces.arrays.remove(key);
    }

    /// Clear all values from the store
    pub fn clear(&self) {
        *self.spaces.write() = Spaces::default();
    }

    /// Total number of entries across all key spaces
    pub fn len(&self) -> usize {
        let spaces = self.spaces.read();
        spaces.scalars.len() + spaces.maps.len() + spaces.arrays.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.spaces.read().scalars.get(key).cloned()
    }

    fn get_map(&self, key: &str) -> Option<StringMap> {
        self.spaces.read().maps.get(key).cloned()
    }

    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.spaces.read().arrays.get(key).cloned()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            spaces: RwLock::new(self.spaces.read().clone()),
        }
    }
}
