//! Local disk filesystem backend

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use super::traits::{check_entry_name, Filesystem, FilesystemProvider, FsEntry, FsError, FsResult};

/// A directory on local disk
#[derive(Debug, Clone)]
pub struct LocalFilesystem {
    location: String,
    root: PathBuf,
}

impl LocalFilesystem {
    /// Open a directory; fails if it does not exist or is not a directory
    pub fn open_dir(location: impl Into<String>, root: impl Into<PathBuf>) -> FsResult<Self> {
        let location = location.into();
        let root = root.into();
        let metadata = fs::metadata(&root)
            .map_err(|e| FsError::unreachable(location.clone(), e.to_string()))?;
        if !metadata.is_dir() {
            return Err(FsError::unreachable(location, "not a directory"));
        }
        Ok(Self { location, root })
    }

    /// Directory this handle reads from
    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

impl Filesystem for LocalFilesystem {
    fn location(&self) -> &str {
        &self.location
    }

    /// Entries sorted by name
    fn read_dir(&self) -> FsResult<Vec<FsEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type()?.is_dir();
            entries.push(FsEntry { name, is_dir });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, name: &str) -> FsResult<Box<dyn Read + Send + '_>> {
        check_entry_name(name)?;
        let file = File::open(self.root.join(name))?;
        Ok(Box::new(file))
    }
}

/// Serves `file://` URLs
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFsProvider;

impl LocalFsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl FilesystemProvider for LocalFsProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>> {
        let path = url
            .to_file_path()
            .map_err(|_| FsError::invalid_location(url.as_str(), "not a local file path"))?;
        Ok(Arc::new(LocalFilesystem::open_dir(url.as_str(), path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_read_dir_sorted_with_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.yml"), "b").unwrap();
        fs::write(dir.path().join("a.yml"), "a").unwrap();
        fs::create_dir(dir.path().join("c.yml")).unwrap();

        let local = LocalFilesystem::open_dir("test", dir.path()).unwrap();
        let entries = local.read_dir().unwrap();
        assert_eq!(
            entries,
            vec![FsEntry::file("a.yml"), FsEntry::file("b.yml"), FsEntry::dir("c.yml")]
        );
    }

    #[test]
    fn test_local_open_reads_bytes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.yml"), "name: bob").unwrap();

        let local = LocalFilesystem::open_dir("test", dir.path()).unwrap();
        let mut content = String::new();
        local.open("a.yml").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "name: bob");

        assert!(matches!(local.open("missing.yml"), Err(FsError::Io(_))));
        assert!(matches!(local.open("../a.yml"), Err(FsError::InvalidName(_))));
    }

    #[test]
    fn test_local_open_dir_errors() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            LocalFilesystem::open_dir("missing", dir.path().join("missing")),
            Err(FsError::Unreachable { .. })
        ));
        assert!(matches!(
            LocalFilesystem::open_dir("file", &file),
            Err(FsError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_local_provider_resolves_file_url() {
        let dir = tempdir().unwrap();
        let url = Url::from_directory_path(dir.path()).unwrap();

        let provider = LocalFsProvider::new();
        assert_eq!(provider.schemes(), vec!["file".to_string()]);
        let handle = provider.open_location(&url).unwrap();
        assert_eq!(handle.location(), url.as_str());
        assert!(handle.read_dir().unwrap().is_empty());
    }
}
