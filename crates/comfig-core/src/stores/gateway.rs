//! Layered key-value gateway with first-match fallback

use std::sync::Arc;

use super::traits::{Store, StringMap};

/// An ordered chain of stores with first-match fallback
///
/// Stores are searched in the order they were added: the first store that
/// reports a hit wins, later stores are never consulted for that key. This is
/// how overrides are layered, e.g. environment-specific secrets registered
/// ahead of shared defaults.
///
/// The gateway owns no data and never fails. A key missing from every store
/// yields `""` from [`KvStoreGateway::get`] (indistinguishable from a stored
/// empty string; use [`KvStoreGateway::lookup`] when that matters) and `None`
/// from the map and array lookups.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use comfig_core::stores::{KvStoreGateway, MemoryStore};
///
/// let secrets = Arc::new(MemoryStore::new());
/// let defaults = Arc::new(MemoryStore::new());
/// secrets.set("db_password", "hunter2");
/// defaults.set("db_password", "changeme");
/// defaults.set("db_host", "localhost");
///
/// let mut gateway = KvStoreGateway::new();
/// gateway.add_store(secrets);
/// gateway.add_store(defaults);
///
/// assert_eq!(gateway.get("db_password"), "hunter2");
/// assert_eq!(gateway.get("db_host"), "localhost");
/// assert_eq!(gateway.get("missing"), "");
/// ```
#[derive(Default, Clone)]
pub struct KvStoreGateway {
    stores: Vec<Arc<dyn Store>>,
}

impl KvStoreGateway {
    /// Create an empty gateway
    pub fn new() -> Self {
        Self { stores: Vec::new() }
    }

    /// Create a gateway from stores already in priority order
    pub fn with_stores(stores: Vec<Arc<dyn Store>>) -> Self {
        Self { stores }
    }

    /// Append a store at the lowest priority
    ///
    /// No deduplication: adding the same store twice is allowed and harmless.
    pub fn add_store(&mut self, store: Arc<dyn Store>) {
        self.stores.push(store);
    }

    /// Get the stores in priority order
    pub fn stores(&self) -> &[Arc<dyn Store>] {
        &self.stores
    }

    /// Number of registered stores
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Check if no stores are registered
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Scalar value from the first store holding `key`, or `""`
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }

    /// Map value from the first store holding `key`
    pub fn get_map(&self, key: &str) -> Option<StringMap> {
        self.stores.iter().find_map(|store| store.get_map(key))
    }

    /// Array value from the first store holding `key` as an array
    ///
    /// Only array lookups participate: a key a store holds as a map never
    /// satisfies this call.
    pub fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.stores.iter().find_map(|store| store.get_array(key))
    }

    /// Scalar lookup that keeps the found/not-found signal
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.stores.iter().find_map(|store| store.get(key))
    }

    /// Find which store satisfies a scalar lookup for `key`
    pub fn find_store(&self, key: &str) -> Option<&Arc<dyn Store>> {
        self.stores.iter().find(|store| store.has(key))
    }
}

impl Store for KvStoreGateway {
    fn name(&self) -> &str {
        "gateway"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key)
    }

    fn get_map(&self, key: &str) -> Option<StringMap> {
        KvStoreGateway::get_map(self, key)
    }

    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        KvStoreGateway::get_array(self, key)
    }
}

// Implement Debug manually since Arc<dyn Store> doesn't implement Debug
impl std::fmt::Debug for KvStoreGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("KvStoreGateway")
            .field("stores", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;

    fn map_of(pairs: &[(&str, &str)]) -> StringMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_gateway_empty_returns_absent() {
        let gateway = KvStoreGateway::new();
        assert!(gateway.is_empty());
        assert_eq!(gateway.get("anything"), "");
        assert_eq!(gateway.lookup("anything"), None);
        assert_eq!(gateway.get_map("anything"), None);
        assert_eq!(gateway.get_array("anything"), None);
        assert!(gateway.find_store("anything").is_none());
    }

    #[test]
    fn test_gateway_fallback() {
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());

        // Only store2 has the key
        store2.set("key", "from_store2");

        let gateway = KvStoreGateway::with_stores(vec![store1, store2]);
        assert_eq!(gateway.get("key"), "from_store2");
    }

    #[test]
    fn test_gateway_priority_is_registration_order() {
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());
        let store3 = Arc::new(MemoryStore::new());

        store1.set("a", "1");
        store2.set("a", "2");
        store2.set("b", "2");
        store3.set("b", "3");
        store3.set("c", "3");

        let mut gateway = KvStoreGateway::new();
        gateway.add_store(store1);
        gateway.add_store(store2);
        gateway.add_store(store3);

        assert_eq!(gateway.len(), 3);
        assert_eq!(gateway.get("a"), "1");
        assert_eq!(gateway.get("b"), "2");
        assert_eq!(gateway.get("c"), "3");
        assert_eq!(gateway.get("d"), "");
    }

    #[test]
    fn test_gateway_empty_string_hit_shadows_lower_stores() {
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());
        store1.set("key", "");
        store2.set("key", "fallback");

        let gateway = KvStoreGateway::with_stores(vec![store1, store2]);

        // A stored empty string is a hit, but reads the same as a miss via get()
        assert_eq!(gateway.get("key"), "");
        assert_eq!(gateway.lookup("key"), Some(String::new()));
    }

    #[test]
    fn test_gateway_map_fallback() {
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());
        store1.set("db", "scalar, not a map");
        store2.set_map("db", map_of(&[("host", "db.local")]));

        let gateway = KvStoreGateway::with_stores(vec![store1, store2]);
        assert_eq!(gateway.get_map("db"), Some(map_of(&[("host", "db.local")])));
    }

    #[test]
    fn test_gateway_array_fallback_uses_array_lookups() {
        // Earlier revisions fell back over map lookups here. Arrays are now
        // resolved from the array key space only: a map under the same key
        // in a higher-priority store must not shadow the array.
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());
        store1.set_map("zones", map_of(&[("a", "1")]));
        store2.set_array("zones", vec!["eu-1".to_string(), "eu-2".to_string()]);

        let gateway = KvStoreGateway::with_stores(vec![store1.clone(), store2]);
        assert_eq!(
            gateway.get_array("zones"),
            Some(vec!["eu-1".to_string(), "eu-2".to_string()])
        );

        let only_map = KvStoreGateway::with_stores(vec![store1]);
        assert_eq!(only_map.get_array("zones"), None);
    }

    #[test]
    fn test_gateway_find_store() {
        let store1 = Arc::new(MemoryStore::new());
        let store2 = Arc::new(MemoryStore::new());
        store2.set("key", "value");

        let mut gateway = KvStoreGateway::new();
        gateway.add_store(store1);
        gateway.add_store(store2);

        let found = gateway.find_store("key").unwrap();
        assert_eq!(found.get("key"), Some("value".to_string()));
        assert!(gateway.find_store("missing").is_none());
    }

    #[test]
    fn test_gateway_nests_as_store() {
        let inner_store = Arc::new(MemoryStore::new());
        inner_store.set("key", "inner");
        let inner = KvStoreGateway::with_stores(vec![inner_store]);

        let outer_store = Arc::new(MemoryStore::new());
        outer_store.set("other", "outer");

        let outer = KvStoreGateway::with_stores(vec![outer_store, Arc::new(inner)]);
        assert_eq!(outer.get("key"), "inner");
        assert_eq!(outer.get("other"), "outer");
        assert_eq!(outer.stores()[1].name(), "gateway");
    }

    #[test]
    fn test_gateway_debug_lists_store_names() {
        let gateway = KvStoreGateway::with_stores(vec![Arc::new(MemoryStore::new())]);
        assert_eq!(format!("{:?}", gateway), "KvStoreGateway { stores: [\"memory\"] }");
    }
}
