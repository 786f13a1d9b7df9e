//! In-memory volumes served under `mem://`

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use url::Url;

use super::traits::{check_entry_name, Filesystem, FilesystemProvider, FsEntry, FsError, FsResult};

#[derive(Debug, Clone)]
enum MemEntry {
    File { name: String, data: Vec<u8> },
    Dir { name: String },
}

impl MemEntry {
    fn name(&self) -> &str {
        match self {
            MemEntry::File { name, .. } | MemEntry::Dir { name } => name,
        }
    }
}

/// A flat in-memory directory
///
/// Entries list in insertion order. Replacing an entry keeps its position.
#[derive(Debug)]
pub struct MemoryFilesystem {
    location: String,
    entries: RwLock<Vec<MemEntry>>,
}

impl MemoryFilesystem {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace a file
    pub fn add_file(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.insert(MemEntry::File {
            name: name.into(),
            data: data.into(),
        });
    }

    /// Add or replace a subdirectory entry
    pub fn add_dir(&self, name: impl Into<String>) {
        self.insert(MemEntry::Dir { name: name.into() });
    }

    /// Remove an entry, returning whether it existed
    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|entry| entry.name() != name);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn insert(&self, entry: MemEntry) {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|existing| existing.name() == entry.name()) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }
}

impl Filesystem for MemoryFilesystem {
    fn location(&self) -> &str {
        &self.location
    }

    fn read_dir(&self) -> FsResult<Vec<FsEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|entry| match entry {
                MemEntry::File { name, .. } => FsEntry::file(name.clone()),
                MemEntry::Dir { name } => FsEntry::dir(name.clone()),
            })
            .collect())
    }

    fn open(&self, name: &str) -> FsResult<Box<dyn Read + Send + '_>> {
        check_entry_name(name)?;
        let entries = self.entries.read();
        match entries.iter().find(|entry| entry.name() == name) {
            Some(MemEntry::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(MemEntry::Dir { .. }) => Err(FsError::InvalidName(format!("{} is a directory", name))),
            None => Err(FsError::NotFound(format!("{}/{}", self.location, name))),
        }
    }
}

static SHARED: Lazy<Arc<MemoryFsProvider>> = Lazy::new(|| Arc::new(MemoryFsProvider::new()));

/// Named volumes addressed as `mem://<volume>`
#[derive(Debug, Default)]
pub struct MemoryFsProvider {
    volumes: RwLock<HashMap<String, Arc<MemoryFilesystem>>>,
}

impl MemoryFsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide provider registered under `mem` by default
    pub fn shared() -> Arc<MemoryFsProvider> {
        Arc::clone(&SHARED)
    }

    /// Get a volume, creating it empty if needed
    pub fn volume(&self, name: &str) -> Arc<MemoryFilesystem> {
        if let Some(volume) = self.volumes.read().get(name) {
            return Arc::clone(volume);
        }
        let mut volumes = self.volumes.write();
        Arc::clone(
            volumes
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryFilesystem::new(format!("mem://{}", name)))),
        )
    }

    pub fn remove_volume(&self, name: &str) -> bool {
        self.volumes.write().remove(name).is_some()
    }

    /// Volume names, sorted
    pub fn volumes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.volumes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl FilesystemProvider for MemoryFsProvider {
    fn name(&self) -> &str {
        "mem"
    }

    fn schemes(&self) -> Vec<String> {
        vec!["mem".to_string()]
    }

    fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>> {
        let host = url.host_str().unwrap_or_default();
        let path = url.path().trim_matches('/');
        let name = match (host.is_empty(), path.is_empty()) {
            (true, _) => path.to_string(),
            (false, true) => host.to_string(),
            (false, false) => format!("{}/{}", host, path),
        };
        if name.is_empty() {
            return Err(FsError::invalid_location(url.as_str(), "missing volume name"));
        }

        let volume = self.volumes.read().get(&name).cloned();
        match volume {
            Some(volume) => Ok(volume),
            None => Err(FsError::unreachable(url.as_str(), format!("no volume named '{}'", name))),
        }
    }
}
