//! Environment variable key-value store

use std::env;

use super::traits::{Store, StringMap};

/// Store that reads from environment variables
///
/// This store is read-only. Keys are mapped to variable names by
/// upper-casing them and replacing `.` and `-` with `_`, optionally behind a
/// prefix:
///
/// - `db.host` → `DB_HOST`
/// - with prefix `APP`: `db.host` → `APP_DB_HOST`
///
/// The key is also tried verbatim so `PATH`-style names work unchanged.
///
/// Maps and arrays are derived from the same variables:
/// - `get_array("hosts")` splits `HOSTS=a,b,c` on commas (trimming blanks)
/// - `get_map("db")` collects every `DB_*` variable, keyed by the lower-cased
///   remainder (`DB_HOST=x` → `host: x`)
///
/// # Example
///
/// ```
/// use comfig_core::stores::EnvStore;
///
/// let store = EnvStore::with_prefix("MYAPP");
/// // store.get("db.host") reads MYAPP_DB_HOST
/// ```
#[derive(Debug, Default, Clone)]
pub struct EnvStore {
    prefix: Option<String>,
}

impl EnvStore {
    /// Create a store without a prefix
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Create a store that only sees variables behind `PREFIX_`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('_').to_uppercase();
        Self {
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        }
    }

    /// Variable name a key maps to
    pub fn var_name(&self, key: &str) -> String {
        let normalized: String = key
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, normalized),
            None => normalized,
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        if self.prefix.is_none() {
            if let Ok(value) = env::var(key) {
                return Some(value);
            }
        }
        env::var(self.var_name(key)).ok()
    }
}

impl Store for EnvStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.read(key)
    }

    fn get_map(&self, key: &str) -> Option<StringMap> {
        let head = format!("{}_", self.var_name(key));
        let map: StringMap = env::vars()
            .filter_map(|(name, value)| {
                name.strip_prefix(&head)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_lowercase(), value))
            })
            .collect();
        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }

    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.read(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_name() {
        let store = EnvStore::new();
        assert_eq!(store.name(), "env");
    }

    #[test]
    fn test_env_store_var_name() {
        assert_eq!(EnvStore::new().var_name("db.host"), "DB_HOST");
        assert_eq!(EnvStore::new().var_name("log-level"), "LOG_LEVEL");
        assert_eq!(EnvStore::with_prefix("app").var_name("db.host"), "APP_DB_HOST");
        assert_eq!(EnvStore::with_prefix("APP_").var_name("x"), "APP_X");
        assert_eq!(EnvStore::with_prefix("").var_name("x"), "X");
    }

    #[test]
    fn test_env_store_get_direct_and_mapped() {
        env::set_var("COMFIG_TEST_ENV_DIRECT", "direct");
        env::set_var("COMFIG_TEST_ENV_DOTTED_KEY", "mapped");

        let store = EnvStore::new();
        assert_eq!(store.get("COMFIG_TEST_ENV_DIRECT"), Some("direct".to_string()));
        assert_eq!(store.get("comfig.test.env.dotted-key"), Some("mapped".to_string()));
        assert_eq!(store.get("comfig_test_env_missing_xyz"), None);

        env::remove_var("COMFIG_TEST_ENV_DIRECT");
        env::remove_var("COMFIG_TEST_ENV_DOTTED_KEY");
    }

    #[test]
    fn test_env_store_prefix_hides_unprefixed() {
        env::set_var("COMFIG_PREFIXED_NAME", "bob");
        env::set_var("COMFIG_UNPREFIXED_ONLY", "visible-without-prefix");

        let store = EnvStore::with_prefix("COMFIG_PREFIXED");
        assert_eq!(store.get("name"), Some("bob".to_string()));
        assert_eq!(store.get("COMFIG_UNPREFIXED_ONLY"), None);

        env::remove_var("COMFIG_PREFIXED_NAME");
        env::remove_var("COMFIG_UNPREFIXED_ONLY");
    }

    #[test]
    fn test_env_store_array() {
        env::set_var("COMFIG_TEST_ARRAY_HOSTS", "a, b,,c ");

        let store = EnvStore::with_prefix("COMFIG_TEST_ARRAY");
        assert_eq!(
            store.get_array("hosts"),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(store.get_array("missing"), None);

        env::remove_var("COMFIG_TEST_ARRAY_HOSTS");
    }

    #[test]
    fn test_env_store_map() {
        env::set_var("COMFIG_TEST_MAP_DB_HOST", "db.local");
        env::set_var("COMFIG_TEST_MAP_DB_PORT", "5432");

        let store = EnvStore::with_prefix("COMFIG_TEST_MAP");
        let map = store.get_map("db").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("host"), Some(&"db.local".to_string()));
        assert_eq!(map.get("port"), Some(&"5432".to_string()));
        assert_eq!(store.get_map("nothing"), None);

        env::remove_var("COMFIG_TEST_MAP_DB_HOST");
        env::remove_var("COMFIG_TEST_MAP_DB_PORT");
    }
}
