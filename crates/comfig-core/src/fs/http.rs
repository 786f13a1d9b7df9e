//! HTTP directory backend
//!
//! A location like `https://host/configs/` is listed by fetching it and
//! scraping the `href` links of the returned autoindex page (nginx, Apache,
//! `python -m http.server` and similar all produce one). Only links that
//! resolve to an immediate child of the location count; parent links, sort
//! links (`?C=N;O=D`) and fragments are skipped. A trailing `/` marks a
//! subdirectory.
//!
//! Resolving a location fetches its index once, so an unreachable server or
//! an error status fails resolution instead of the later listing.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex_lite::Regex;
use reqwest::blocking::Client;
use url::Url;

use super::traits::{check_entry_name, Filesystem, FilesystemProvider, FsEntry, FsError, FsResult};

static HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("href pattern is valid")
});

/// Options for the HTTP backend
#[derive(Debug, Clone)]
pub struct HttpFsOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpFsOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("comfig/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpFsOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build_client(&self) -> FsResult<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// A directory served over HTTP
pub struct HttpFilesystem {
    location: String,
    base: Url,
    client: Client,
    /// Index body fetched at resolution, consumed by the first listing
    index: Mutex<Option<String>>,
}

impl HttpFilesystem {
    pub fn new(url: &Url, client: Client) -> Self {
        let mut base = url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self {
            location: url.to_string(),
            base,
            client,
            index: Mutex::new(None),
        }
    }

    /// Build a handle and fetch its index, failing if the server cannot serve it
    pub fn connect(url: &Url, client: Client) -> FsResult<Self> {
        let fs = Self::new(url, client);
        let body = fs.fetch(&fs.base)?.text()?;
        *fs.index.lock() = Some(body);
        Ok(fs)
    }

    /// Directory URL, always ending in `/`
    pub fn base(&self) -> &Url {
        &self.base
    }

    fn fetch(&self, url: &Url) -> FsResult<reqwest::blocking::Response> {
        let response = self.client.get(url.clone()).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// Map an `href` to an immediate child entry of the base, if it is one
    fn child_entry(&self, href: &str) -> Option<FsEntry> {
        if href.is_empty() || href.starts_with('?') || href.starts_with('#') {
            return None;
        }
        let target = self.base.join(href).ok()?;
        if target.scheme() != self.base.scheme()
            || target.host_str() != self.base.host_str()
            || target.port_or_known_default() != self.base.port_or_known_default()
        {
            return None;
        }

        let rest = target.path().strip_prefix(self.base.path())?;
        let (raw, is_dir) = match rest.strip_suffix('/') {
            Some(dir) => (dir, true),
            None => (rest, false),
        };
        if raw.is_empty() || raw.contains('/') {
            return None;
        }
        let name = urlencoding::decode(raw).ok()?.into_owned();
        check_entry_name(&name).ok()?;
        Some(FsEntry { name, is_dir })
    }

    fn parse_listing(&self, body: &str) -> Vec<FsEntry> {
        let mut seen = HashSet::new();
        HREF.captures_iter(body)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .filter_map(|href| self.child_entry(&decode_entities(href.as_str())))
            .filter(|entry| seen.insert(entry.name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for HttpFilesystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFilesystem")
            .field("location", &self.location)
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl Filesystem for HttpFilesystem {
    fn location(&self) -> &str {
        &self.location
    }

    fn read_dir(&self) -> FsResult<Vec<FsEntry>> {
        let cached = self.index.lock().take();
        let body = match cached {
            Some(body) => body,
            None => self.fetch(&self.base)?.text()?,
        };
        Ok(self.parse_listing(&body))
    }

    fn open(&self, name: &str) -> FsResult<Box<dyn Read + Send + '_>> {
        check_entry_name(name)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FsError::invalid_location(self.base.as_str(), "cannot hold path segments"))?
            .pop_if_empty()
            .push(name);
        Ok(Box::new(self.fetch(&url)?))
    }
}

/// Serves `http://` and `https://` locations
pub struct HttpFsProvider {
    client: Client,
}

impl HttpFsProvider {
    pub fn new() -> FsResult<Self> {
        Self::with_options(HttpFsOptions::default())
    }

    pub fn with_options(options: HttpFsOptions) -> FsResult<Self> {
        Ok(Self {
            client: options.build_client()?,
        })
    }
}

impl std::fmt::Debug for HttpFsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFsProvider").finish_non_exhaustive()
    }
}

impl FilesystemProvider for HttpFsProvider {
    fn name(&self) -> &str {
        "http"
    }

    fn schemes(&self) -> Vec<String> {
        vec!["http".to_string(), "https".to_string()]
    }

    fn open_location(&self, url: &Url) -> FsResult<Arc<dyn Filesystem>> {
        if url.host_str().is_none() {
            return Err(FsError::invalid_location(url.as_str(), "missing host"));
        }
        let fs = HttpFilesystem::connect(url, self.client.clone())
            .map_err(|e| FsError::unreachable(url.as_str(), e.to_string()))?;
        Ok(Arc::new(fs))
    }
}

fn decode_entities(href: &str) -> String {
    href.replace("&amp;", "&")
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
}
