//! Filesystem provider registry for discovering backends by name

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::blob::BlobFsProvider;
use super::http::HttpFsProvider;
use super::local::LocalFsProvider;
use super::memory::MemoryFsProvider;
use super::mux::FsMux;
use super::traits::{FilesystemProvider, FsResult};

/// Factory function type for creating providers
pub type ProviderFactory = Box<dyn Fn() -> FsResult<Arc<dyn FilesystemProvider>> + Send + Sync>;

/// Definition of a registered filesystem provider
pub struct FilesystemDefinition {
    /// Unique name for this provider
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factory function to create instances
    pub factory: ProviderFactory,
}

impl std::fmt::Debug for FilesystemDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

fn definition(name: &str, description: &str, factory: ProviderFactory) -> (String, FilesystemDefinition) {
    (
        name.to_string(),
        FilesystemDefinition {
            name: name.to_string(),
            description: description.to_string(),
            factory,
        },
    )
}

fn local_provider() -> FsResult<Arc<dyn FilesystemProvider>> {
    Ok(Arc::new(LocalFsProvider::new()))
}

fn http_provider() -> FsResult<Arc<dyn FilesystemProvider>> {
    Ok(Arc::new(HttpFsProvider::new()?))
}

fn blob_provider() -> FsResult<Arc<dyn FilesystemProvider>> {
    Ok(Arc::new(BlobFsProvider::new()))
}

fn memory_provider() -> FsResult<Arc<dyn FilesystemProvider>> {
    Ok(MemoryFsProvider::shared())
}

/// Global registry of filesystem providers
static REGISTRY: Lazy<RwLock<HashMap<String, FilesystemDefinition>>> = Lazy::new(|| {
    let map = HashMap::from([
        definition(
            "file",
            "Local directories, addressed by file:// URL or bare path",
            Box::new(local_provider),
        ),
        definition(
            "http",
            "HTTP(S) directories listed through autoindex pages",
            Box::new(http_provider),
        ),
        definition(
            "s3",
            "S3-compatible object storage (s3://bucket/prefix?region=..)",
            Box::new(blob_provider),
        ),
        definition(
            "mem",
            "Process-wide in-memory volumes (mem://<volume>)",
            Box::new(memory_provider),
        ),
    ]);
    RwLock::new(map)
});

/// Register a filesystem provider, replacing any with the same name
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use comfig_core::fs::{
///     register_filesystem, unregister_filesystem, FilesystemProvider, FsResult, MemoryFsProvider,
/// };
///
/// fn scratch() -> FsResult<Arc<dyn FilesystemProvider>> {
///     Ok(Arc::new(MemoryFsProvider::new()))
/// }
///
/// register_filesystem("scratch", "Private in-memory volumes", Box::new(scratch));
/// assert!(unregister_filesystem("scratch"));
/// ```
pub fn register_filesystem(name: &str, description: &str, factory: ProviderFactory) {
    let (key, def) = definition(name, description, factory);
    REGISTRY.write().insert(key, def);
}

/// Unregister a provider (mainly for testing)
pub fn unregister_filesystem(name: &str) -> bool {
    REGISTRY.write().remove(name).is_some()
}

/// Check if a provider is registered
pub fn has_filesystem(name: &str) -> bool {
    REGISTRY.read().contains_key(name)
}

/// List registered providers as (name, description), sorted by name
pub fn list_filesystems() -> Vec<(String, String)> {
    let mut list: Vec<(String, String)> = REGISTRY
        .read()
        .values()
        .map(|def| (def.name.clone(), def.description.clone()))
        .collect();
    list.sort();
    list
}

/// Create a provider by name
///
/// Returns None if the name is not registered.
pub fn create_filesystem_provider(name: &str) -> Option<FsResult<Arc<dyn FilesystemProvider>>> {
    REGISTRY.read().get(name).map(|def| (def.factory)())
}

/// Build a mux holding one instance of every registered provider
///
/// Providers whose factory fails are left out, so their schemes resolve
/// as unsupported.
pub fn default_mux() -> FsMux {
    let registry = REGISTRY.read();
    let mut names: Vec<&String> = registry.keys().collect();
    names.sort();

    let mut mux = FsMux::new();
    for name in names {
        match (registry[name].factory)() {
            Ok(provider) => {
                mux.add(provider);
            }
            Err(e) => {
                tracing::warn!(target: "comfig", provider = %name, error = %e, "filesystem provider unavailable");
            }
        }
    }
    mux
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{Filesystem, FsError};
    use url::Url;

    #[test]
    fn test_builtin_filesystems_registered() {
        assert!(has_filesystem("file"));
        assert!(has_filesystem("http"));
        assert!(has_filesystem("mem"));
        assert!(has_filesystem("s3"));
    }

    #[test]
    fn test_create_builtin_provider() {
        let provider = create_filesystem_provider("file").unwrap().unwrap();
        assert_eq!(provider.name(), "file");
        assert!(create_filesystem_provider("nonexistent_xyz").is_none());
    }

    #[test]
    fn test_list_filesystems_sorted() {
        let names: Vec<String> = list_filesystems().into_iter().map(|(n, _)| n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"mem".to_string()));
    }

    #[test]
    fn test_default_mux_schemes() {
        let schemes = default_mux().schemes();
        for scheme in ["file", "http", "https", "mem", "s3"] {
            assert!(schemes.contains(&scheme.to_string()), "missing {}", scheme);
        }
    }

    #[test]
    fn test_register_custom_filesystem() {
        struct Scratch;

        impl FilesystemProvider for Scratch {
            fn name(&self) -> &str {
                "scratch"
            }

            fn schemes(&self) -> Vec<String> {
                vec!["scratch-test".to_string()]
            }

            fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>> {
                Err(FsError::unreachable(url.as_str(), "always empty"))
            }
        }

        fn scratch() -> FsResult<Arc<dyn FilesystemProvider>> {
            Ok(Arc::new(Scratch))
        }

        register_filesystem("scratch_test", "A test provider", Box::new(scratch));
        assert!(has_filesystem("scratch_test"));
        assert!(default_mux().schemes().contains(&"scratch-test".to_string()));

        // Clean up
        assert!(unregister_filesystem("scratch_test"));
        assert!(!has_filesystem("scratch_test"));
    }
}
