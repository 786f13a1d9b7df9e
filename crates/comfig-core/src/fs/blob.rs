//! S3-compatible object storage backend
//!
//! A location like `s3://bucket/configs?region=eu-west-1` treats the key
//! prefix `configs/` as a directory: objects directly under it are files and
//! common prefixes are subdirectories. Query parameters tune the client:
//!
//! | parameter          | effect                                          |
//! |--------------------|-------------------------------------------------|
//! | `region`           | bucket region                                   |
//! | `endpoint`         | custom endpoint (MinIO, localstack, ...)        |
//! | `disableSSL`       | `true` allows plain `http` endpoints            |
//! | `s3ForcePathStyle` | `false` switches to virtual-hosted requests     |
//! | `anonymous`        | `true` sends unsigned requests                  |
//!
//! Credentials and anything not set in the query come from the usual
//! `AWS_*` environment variables.

use std::io::{Cursor, Read};
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ListResult, ObjectStore};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use url::Url;

use super::traits::{check_entry_name, Filesystem, FilesystemProvider, FsEntry, FsError, FsResult};

/// A key prefix in an object store bucket
pub struct BlobFilesystem {
    location: String,
    prefix: Option<ObjectPath>,
    store: Arc<dyn ObjectStore>,
    runtime: Arc<Runtime>,
    /// Listing fetched at resolution, consumed by the first `read_dir`
    listing: Mutex<Option<ListResult>>,
}

impl BlobFilesystem {
    fn list(&self) -> FsResult<ListResult> {
        Ok(self
            .runtime
            .block_on(self.store.list_with_delimiter(self.prefix.as_ref()))?)
    }

    fn object_path(&self, name: &str) -> ObjectPath {
        match &self.prefix {
            Some(prefix) => prefix.child(name),
            None => ObjectPath::from(name),
        }
    }

    fn entries(&self, listing: ListResult) -> Vec<FsEntry> {
        let files = listing
            .objects
            .into_iter()
            // Zero-length "folder" markers share the prefix's own key
            .filter(|object| Some(&object.location) != self.prefix.as_ref())
            .filter_map(|object| object.location.filename().map(FsEntry::file));
        let dirs = listing
            .common_prefixes
            .into_iter()
            .filter_map(|prefix| prefix.filename().map(FsEntry::dir));
        files.chain(dirs).collect()
    }
}

impl std::fmt::Debug for BlobFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobFilesystem")
            .field("location", &self.location)
            .field("prefix", &self.prefix.as_ref().map(|p| p.to_string()))
            .finish()
    }
}

impl Filesystem for BlobFilesystem {
    fn location(&self) -> &str {
        &self.location
    }

    fn read_dir(&self) -> FsResult<Vec<FsEntry>> {
        let cached = self.listing.lock().take();
        let listing = match cached {
            Some(listing) => listing,
            None => self.list()?,
        };
        Ok(self.entries(listing))
    }

    fn open(&self, name: &str) -> FsResult<Box<dyn Read + Send + '_>> {
        check_entry_name(name)?;
        let path = self.object_path(name);
        let bytes = self
            .runtime
            .block_on(async { self.store.get(&path).await?.bytes().await })
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => FsError::NotFound(path.to_string()),
                other => FsError::ObjectStore(other),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Serves `s3://` locations
///
/// Requests run on a private single-threaded runtime, so handles must not be
/// used from inside another async runtime.
#[derive(Default)]
pub struct BlobFsProvider {
    runtime: OnceCell<Arc<Runtime>>,
}

impl BlobFsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn runtime(&self) -> FsResult<Arc<Runtime>> {
        let runtime = self
            .runtime
            .get_or_try_init(|| Builder::new_current_thread().enable_all().build().map(Arc::new))?;
        Ok(runtime.clone())
    }
}

impl std::fmt::Debug for BlobFsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobFsProvider").finish_non_exhaustive()
    }
}

impl FilesystemProvider for BlobFsProvider {
    fn name(&self) -> &str {
        "s3"
    }

    fn schemes(&self) -> Vec<String> {
        vec!["s3".to_string()]
    }

    fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>> {
        let store = build_store(url)?;
        let fs = BlobFilesystem {
            location: url.to_string(),
            prefix: key_prefix(url)?,
            store: Arc::new(store),
            runtime: self.runtime()?,
            listing: Mutex::new(None),
        };

        let listing = fs
            .list()
            .map_err(|e| FsError::unreachable(url.as_str(), e.to_string()))?;
        *fs.listing.lock() = Some(listing);
        Ok(Arc::new(fs))
    }
}

fn build_store(url: &Url) -> FsResult<object_store::aws::AmazonS3> {
    let bucket = match url.host_str() {
        Some(bucket) if !bucket.is_empty() => bucket,
        _ => return Err(FsError::invalid_location(url.as_str(), "missing bucket name")),
    };

    let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
    let mut endpoint = None;
    let mut disable_ssl = false;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "region" => builder = builder.with_region(value.into_owned()),
            "endpoint" => endpoint = Some(value.into_owned()),
            "disableSSL" => {
                disable_ssl = parse_flag(url, &key, &value)?;
                builder = builder.with_allow_http(disable_ssl);
            }
            "s3ForcePathStyle" => {
                let path_style = parse_flag(url, &key, &value)?;
                builder = builder.with_virtual_hosted_style_request(!path_style);
            }
            "anonymous" => builder = builder.with_skip_signature(parse_flag(url, &key, &value)?),
            other => {
                return Err(FsError::invalid_location(
                    url.as_str(),
                    format!("unknown query parameter '{}'", other),
                ))
            }
        }
    }

    if let Some(endpoint) = endpoint {
        let endpoint = if endpoint.contains("://") {
            endpoint
        } else if disable_ssl {
            format!("http://{}", endpoint)
        } else {
            format!("https://{}", endpoint)
        };
        builder = builder.with_endpoint(endpoint);
    }

    builder
        .build()
        .map_err(|e| FsError::invalid_location(url.as_str(), e.to_string()))
}

fn parse_flag(url: &Url, key: &str, value: &str) -> FsResult<bool> {
    value.parse().map_err(|_| {
        FsError::invalid_location(
            url.as_str(),
            format!("'{}' must be true or false, got '{}'", key, value),
        )
    })
}

fn key_prefix(url: &Url) -> FsResult<Option<ObjectPath>> {
    let decoded = urlencoding::decode(url.path())
        .map_err(|e| FsError::invalid_location(url.as_str(), e.to_string()))?;
    let trimmed = decoded.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    ObjectPath::parse(trimmed)
        .map(Some)
        .map_err(|e| FsError::invalid_location(url.as_str(), e.to_string()))
}
