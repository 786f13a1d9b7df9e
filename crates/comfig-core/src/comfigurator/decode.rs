//! Decoding rendered YAML onto a factory-made default

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Deserializer, Value};

/// Overlay a YAML document onto `base`
///
/// Keys present in the document replace those of `base`, nested mappings
/// merge recursively, and everything else keeps the value `base` had. A
/// document with no content (blank, comments only, or `null`) returns `base`
/// untouched.
///
/// Only the first document of a multi-document stream is decoded. `<<` merge
/// keys are expanded before the overlay is applied.
pub(crate) fn decode_onto<T>(base: T, document: &str) -> Result<T, serde_yaml::Error>
where
    T: Serialize + DeserializeOwned,
{
    if is_blank(document) {
        return Ok(base);
    }
    let Some(first) = Deserializer::from_str(document).next() else {
        return Ok(base);
    };
    let mut overlay = Value::deserialize(first)?;
    if overlay.is_null() {
        return Ok(base);
    }
    overlay.apply_merge()?;

    let mut merged = serde_yaml::to_value(&base)?;
    merge(&mut merged, overlay);
    serde_yaml::from_value(merged)
}

fn merge(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Mapping(target), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

fn is_blank(document: &str) -> bool {
    document.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Database {
        host: String,
        port: u16,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Config {
        name: String,
        replicas: u32,
        tags: Vec<String>,
        database: Database,
    }

    fn defaults() -> Config {
        Config {
            name: "default".to_string(),
            replicas: 1,
            tags: vec!["base".to_string()],
            database: Database {
                host: "localhost".to_string(),
                port: 5432,
            },
        }
    }

    #[test]
    fn test_absent_fields_keep_defaults() {
        let config = decode_onto(defaults(), "name: bob\ndatabase:\n  host: db.local\n").unwrap();
        assert_eq!(config.name, "bob");
        assert_eq!(config.replicas, 1);
        assert_eq!(config.tags, vec!["base"]);
        assert_eq!(config.database.host, "db.local");
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let config = decode_onto(defaults(), "tags: [a, b]\n").unwrap();
        assert_eq!(config.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_documents_return_base() {
        for document in ["", "   \n\n", "# only a comment\n", "---\n", "null", "~"] {
            assert_eq!(decode_onto(defaults(), document).unwrap(), defaults(), "{:?}", document);
        }
    }

    #[test]
    fn test_type_mismatch_fails() {
        assert!(decode_onto(defaults(), "replicas: lots\n").is_err());
        assert!(decode_onto(defaults(), "name: [unclosed\n").is_err());
        assert!(decode_onto(defaults(), "- just\n- a list\n").is_err());
    }

    #[test]
    fn test_merge_keys_are_expanded() {
        let document = "\
shared: &db
  host: db.local
  port: 6432
name: bob
database:
  <<: *db
  port: 7000
";
        let config = decode_onto(defaults(), document).unwrap();
        assert_eq!(config.name, "bob");
        assert_eq!(config.database.host, "db.local");
        assert_eq!(config.database.port, 7000);
    }

    #[test]
    fn test_only_first_document_is_decoded() {
        let config = decode_onto(defaults(), "name: first\nreplicas: 2\n---\nname: second\n").unwrap();
        assert_eq!(config.name, "first");
        assert_eq!(config.replicas, 2);
    }
}
