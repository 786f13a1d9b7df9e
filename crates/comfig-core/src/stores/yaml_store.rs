//! YAML values-file store
//!
//! Loads a flat YAML document of template values, e.g. per-environment
//! defaults kept next to the config templates or under the user config dir.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_yaml::Value;

use super::traits::{Store, StoreError, StoreResult, StringMap};

/// Read-only store backed by a YAML values document
///
/// The top level must be a mapping. Each entry lands in one key space by the
/// shape of its value:
///
/// ```yaml
/// name: bob            # scalar
/// replicas: 3          # scalar ("3")
/// db:                  # map
///   host: db.local
///   port: 5432
/// zones: [eu-1, eu-2]  # array
/// ```
///
/// Nested values deeper than one level are rejected: templates only see
/// flat maps and arrays of strings.
#[derive(Debug, Default, Clone)]
pub struct YamlStore {
    source: Option<PathBuf>,
    scalars: HashMap<String, String>,
    maps: HashMap<String, StringMap>,
    arrays: HashMap<String, Vec<String>>,
}

impl FromStr for YamlStore {
    type Err = StoreError;

    /// Parse values from a YAML string
    fn from_str(content: &str) -> StoreResult<Self> {
        let mut store = Self::default();
        let blank = content.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if blank {
            return Ok(store);
        }
        let document: Value = serde_yaml::from_str(content)?;

        let mapping = match document {
            Value::Null => return Ok(store),
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(StoreError::UnsupportedValue {
                    key: "<root>".to_string(),
                    reason: format!("expected a mapping, found {}", kind_of(&other)),
                })
            }
        };

        for (key, value) in mapping {
            let key = scalar_string(&key).ok_or_else(|| StoreError::UnsupportedValue {
                key: format!("{:?}", key),
                reason: "keys must be scalars".to_string(),
            })?;

            match value {
                Value::Mapping(entries) => {
                    let mut map = StringMap::new();
                    for (k, v) in entries {
                        let (Some(k), Some(v)) = (scalar_string(&k), scalar_string(&v)) else {
                            return Err(nested_error(&key));
                        };
                        map.insert(k, v);
                    }
                    store.maps.insert(key, map);
                }
                Value::Sequence(items) => {
                    let array = items
                        .iter()
                        .map(scalar_string)
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| nested_error(&key))?;
                    store.arrays.insert(key, array);
                }
                scalar => {
                    let value = scalar_string(&scalar).ok_or_else(|| nested_error(&key))?;
                    store.scalars.insert(key, value);
                }
            }
        }

        Ok(store)
    }
}

impl YamlStore {
    /// Load values from a YAML file
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut store: Self = content.parse()?;
        store.source = Some(path.to_path_buf());
        Ok(store)
    }

    /// Load the user-level values file (~/.config/<app>/values.yaml)
    ///
    /// A missing file yields an empty store.
    pub fn user(app: &str) -> StoreResult<Self> {
        let path = Self::user_path(app);
        if !path.exists() {
            return Ok(Self {
                source: Some(path),
                ..Self::default()
            });
        }
        Self::from_path(path)
    }

    /// Path of the user-level values file for `app`
    pub fn user_path(app: &str) -> PathBuf {
        // Use XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        config_dir.join(app).join("values.yaml")
    }

    /// File this store was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Check if the store holds no values
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.maps.is_empty() && self.arrays.is_empty()
    }
}

impl Store for YamlStore {
    fn name(&self) -> &str {
        "yaml"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.scalars.get(key).cloned()
    }

    fn get_map(&self, key: &str) -> Option<StringMap> {
        self.maps.get(key).cloned()
    }

    fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.arrays.get(key).cloned()
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn nested_error(key: &str) -> StoreError {
    StoreError::UnsupportedValue {
        key: key.to_string(),
        reason: "values may be nested at most one level deep".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const VALUES: &str = r#"
name: bob
replicas: 3
debug: false
db:
  host: db.local
  port: 5432
zones: [eu-1, eu-2]
"#;

    #[test]
    fn test_yaml_store_key_spaces() {
        let store = VALUES.parse::<YamlStore>().unwrap();

        assert_eq!(store.name(), "yaml");
        assert_eq!(store.get("name"), Some("bob".to_string()));
        assert_eq!(store.get("replicas"), Some("3".to_string()));
        assert_eq!(store.get("debug"), Some("false".to_string()));
        assert_eq!(store.get("db"), None);

        let db = store.get_map("db").unwrap();
        assert_eq!(db.get("host"), Some(&"db.local".to_string()));
        assert_eq!(db.get("port"), Some(&"5432".to_string()));

        assert_eq!(
            store.get_array("zones"),
            Some(vec!["eu-1".to_string(), "eu-2".to_string()])
        );
        assert_eq!(store.get_array("db"), None);
    }

    #[test]
    fn test_yaml_store_empty_document() {
        let store = "".parse::<YamlStore>().unwrap();
        assert!(store.is_empty());

        let store: YamlStore = "# nothing set yet\n".parse().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_yaml_store_rejects_non_mapping_root() {
        let err = YamlStore::from_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedValue { .. }));
    }

    #[test]
    fn test_yaml_store_rejects_deep_nesting() {
        let err = YamlStore::from_str("db:\n  primary:\n    host: x\n").unwrap_err();
        match err {
            StoreError::UnsupportedValue { key, .. } => assert_eq!(key, "db"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_store_invalid_yaml() {
        let err = YamlStore::from_str("name: [unclosed").unwrap_err();
        assert!(matches!(err, StoreError::Yaml(_)));
    }

    #[test]
    fn test_yaml_store_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("values.yaml");
        fs::write(&path, VALUES).unwrap();

        let store = YamlStore::from_path(&path).unwrap();
        assert_eq!(store.source(), Some(path.as_path()));
        assert_eq!(store.get("name"), Some("bob".to_string()));
    }

    #[test]
    fn test_yaml_store_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = YamlStore::from_path(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_yaml_store_user_path() {
        let path = YamlStore::user_path("comfig-test-app");
        assert!(path.ends_with("comfig-test-app/values.yaml"));
    }
}
