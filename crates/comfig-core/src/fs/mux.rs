//! Scheme-dispatching resolver from location strings to directory handles

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use url::Url;

use super::traits::{Filesystem, FilesystemProvider, FsError, FsResult};

/// Routes each location to the provider registered for its scheme
///
/// Bare paths (`/etc/app`, `./conf`, `C:\conf`) are treated as `file` locations.
#[derive(Clone, Default)]
pub struct FsMux {
    providers: HashMap<String, Arc<dyn FilesystemProvider>>,
}

impl FsMux {
    /// Create an empty mux; see `default_mux` for one with the built-in providers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for every scheme it serves, replacing earlier ones
    pub fn add(&mut self, provider: Arc<dyn FilesystemProvider>) -> &mut Self {
        for scheme in provider.schemes() {
            self.providers.insert(scheme.to_ascii_lowercase(), Arc::clone(&provider));
        }
        self
    }

    /// Drop the provider for a scheme
    pub fn remove(&mut self, scheme: &str) -> Option<Arc<dyn FilesystemProvider>> {
        self.providers.remove(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.providers.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    pub fn provider(&self, scheme: &str) -> Option<Arc<dyn FilesystemProvider>> {
        self.providers.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Resolve a location to a directory handle
    pub fn lookup(&self, location: &str) -> FsResult<Arc<dyn Filesystem>> {
        let url = parse_location(location)?;
        let provider = self
            .providers
            .get(url.scheme())
            .ok_or_else(|| FsError::UnsupportedScheme(url.scheme().to_string()))?;
        provider.open_location(&url)
    }
}

impl std::fmt::Debug for FsMux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsMux").field("schemes", &self.schemes()).finish()
    }
}

/// Parse a location into a URL, turning bare paths into `file://` URLs
pub fn parse_location(location: &str) -> FsResult<Url> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(FsError::invalid_location(location, "empty location"));
    }

    match Url::parse(trimmed) {
        // Single-letter schemes are Windows drive letters
        Ok(url) if url.scheme().len() > 1 => Ok(url),
        Err(e) if trimmed.contains("://") => Err(FsError::invalid_location(location, e.to_string())),
        _ => path_to_url(location, Path::new(trimmed)),
    }
}

fn path_to_url(location: &str, path: &Path) -> FsResult<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_directory_path(&absolute)
        .map_err(|_| FsError::invalid_location(location, "not a usable directory path"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FsEntry, LocalFsProvider, MemoryFsProvider};
    use tempfile::tempdir;

    fn mux() -> FsMux {
        let mut mux = FsMux::new();
        mux.add(Arc::new(LocalFsProvider::new()));
        mux.add(Arc::new(MemoryFsProvider::new()));
        mux
    }

    #[test]
    fn test_parse_location_urls_and_paths() {
        assert_eq!(parse_location("https://host/conf/").unwrap().scheme(), "https");
        assert_eq!(parse_location("s3://bucket/?region=x").unwrap().scheme(), "s3");
        assert_eq!(parse_location("/etc/app").unwrap().as_str(), "file:///etc/app/");
        assert_eq!(parse_location("./conf").unwrap().scheme(), "file");
        assert_eq!(parse_location("C:\\conf").unwrap().scheme(), "file");
    }

    #[test]
    fn test_parse_location_rejects_malformed() {
        assert!(matches!(parse_location(""), Err(FsError::InvalidLocation { .. })));
        assert!(matches!(parse_location("   "), Err(FsError::InvalidLocation { .. })));
        assert!(matches!(parse_location("http://"), Err(FsError::InvalidLocation { .. })));
    }

    #[test]
    fn test_lookup_bare_path_and_file_url() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.yml"), "a").unwrap();
        let mux = mux();

        let handle = mux.lookup(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(handle.read_dir().unwrap(), vec![FsEntry::file("a.yml")]);

        let url = Url::from_directory_path(dir.path()).unwrap();
        let handle = mux.lookup(url.as_str()).unwrap();
        assert_eq!(handle.read_dir().unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_unknown_scheme() {
        match mux().lookup("gopher://host/dir") {
            Err(FsError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "gopher"),
            other => panic!("expected unsupported scheme, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_add_and_remove_provider() {
        let mut mux = mux();
        assert_eq!(mux.schemes(), vec!["file".to_string(), "mem".to_string()]);
        assert!(mux.provider("MEM").is_some());

        assert!(mux.remove("mem").is_some());
        assert!(matches!(mux.lookup("mem://v"), Err(FsError::UnsupportedScheme(_))));
        assert_eq!(format!("{:?}", mux), r#"FsMux { schemes: ["file"] }"#);
    }
}
