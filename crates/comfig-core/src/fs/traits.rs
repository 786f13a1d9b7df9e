//! Core traits and types for filesystem backends

use std::io::Read;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// An immediate child of a directory handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    /// Bare entry name, no path separators
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl FsEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }
}

/// Errors that can occur in filesystem backends
#[derive(Error, Debug)]
pub enum FsError {
    #[error("No filesystem registered for scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Invalid location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("Location unreachable '{location}': {reason}")]
    Unreachable { location: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid entry name '{0}'")]
    InvalidName(String),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn invalid_location(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn unreachable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;

/// A resolved directory: non-recursive listing plus reads of its files
///
/// Listing order is whatever the backend produces; callers must not assume
/// it is sorted.
pub trait Filesystem: Send + Sync {
    /// Location this handle was resolved from
    fn location(&self) -> &str;

    /// List immediate entries; subdirectories are reported, never descended
    fn read_dir(&self) -> FsResult<Vec<FsEntry>>;

    /// Open an entry of this directory for reading
    fn open(&self, name: &str) -> FsResult<Box<dyn Read + Send + '_>>;
}

/// A backend that turns URLs of its schemes into directory handles
///
/// Implementations:
/// - `LocalFsProvider`: `file://` URLs and bare paths
/// - `HttpFsProvider`: `http://` and `https://` autoindex directories
/// - `MemoryFsProvider`: named in-memory volumes under `mem://`
/// - Custom implementations (blob storage, git, etc.)
pub trait FilesystemProvider: Send + Sync {
    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// URL schemes this provider serves
    fn schemes(&self) -> Vec<String>;

    /// Resolve a URL to a directory handle
    fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>>;
}

/// Reject names that would escape the resolved directory
pub(crate) fn check_entry_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_constructors() {
        assert!(!FsEntry::file("a.yml").is_dir);
        assert!(FsEntry::dir("conf.d").is_dir);
    }

    #[test]
    fn test_check_entry_name() {
        assert!(check_entry_name("app.yml").is_ok());
        assert!(check_entry_name(".hidden.yml").is_ok());
        for bad in ["", ".", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert!(matches!(check_entry_name(bad), Err(FsError::InvalidName(_))), "{bad}");
        }
    }
}
