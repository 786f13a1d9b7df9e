//! Core traits and types for key-value stores

use std::collections::BTreeMap;

use thiserror::Error;

/// A flat string-to-string mapping returned by map lookups
pub type StringMap = BTreeMap<String, String>;

/// Errors that can occur while building a store
///
/// Lookups never fail; absence is reported as `None`. Only constructors
/// that load data (e.g. `YamlStore::from_path`) can error.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML values: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported value for key '{key}': {reason}")]
    UnsupportedValue { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for key-value lookup implementations
///
/// A store exposes three independent key spaces: scalars, maps and arrays.
/// Each lookup reports whether the key was found; there is no mutation
/// contract, so a store may be read-only or backed by live data.
///
/// Implementations:
/// - In-memory for tests, defaults and static values (`MemoryStore`)
/// - Environment variables (`EnvStore`)
/// - YAML values files (`YamlStore`)
/// - Chained with fallback (`KvStoreGateway`)
///
/// # Example
///
/// ```
/// use comfig_core::stores::{Store, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set("name", "bob");
/// assert_eq!(store.get("name"), Some("bob".to_string()));
/// assert_eq!(store.get_map("name"), None);
/// ```
pub trait Store: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Look up a scalar value
    fn get(&self, key: &str) -> Option<String>;

    /// Look up a map value
    fn get_map(&self, key: &str) -> Option<StringMap>;

    /// Look up an array value
    fn get_array(&self, key: &str) -> Option<Vec<String>>;

    /// Check if a scalar exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
