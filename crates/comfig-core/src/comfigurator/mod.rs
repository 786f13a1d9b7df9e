//! Discover, render and decode configuration files

mod decode;
mod error;
mod location;
mod pattern;

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fs::{default_mux, Filesystem, FsEntry, FsError, FsMux};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::stores::KvStoreGateway;
use crate::template::{GatewayContext, Template, TemplateError};
use crate::{log_debug, log_error, log_info, log_warn};

pub use error::{ComfigError, ComfigResult};
pub use location::join_location;

/// Shell-glob matching against bare file names
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Turns a directory of templated YAML files into typed config objects
///
/// Each call resolves a location, picks the files whose names match a glob,
/// renders each one as a template against the gateway, and decodes the result
/// into a fresh instance from the factory. The first failure aborts the call.
///
/// ```no_run
/// use std::sync::Arc;
/// use serde::{Deserialize, Serialize};
/// use comfig_core::{Comfigurator, KvStoreGateway, MemoryStore};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct App {
///     name: String,
/// }
///
/// let store = Arc::new(MemoryStore::new());
/// store.set("name", "bob");
/// let mut gateway = KvStoreGateway::new();
/// gateway.add_store(store);
///
/// let mut comfigurator = Comfigurator::new();
/// comfigurator.set_gateway(gateway);
/// let _configs = comfigurator.generate_from_path("file:///etc/app", "*.yml", App::default)?;
/// # Ok::<(), comfig_core::ComfigError>(())
/// ```
pub struct Comfigurator {
    resolver: Arc<FsMux>,
    gateway: Arc<KvStoreGateway>,
    logger: SharedLogger,
}

impl Default for Comfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl Comfigurator {
    /// Create a comfigurator with every registered filesystem, an empty
    /// gateway and no logging
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(default_mux()),
            gateway: Arc::new(KvStoreGateway::new()),
            logger: Arc::new(NoOpLogger::new()),
        }
    }

    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: impl Into<Arc<FsMux>>) -> Self {
        self.resolver = resolver.into();
        self
    }

    /// Replace the logger
    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the gateway templates read from
    pub fn set_gateway(&mut self, gateway: impl Into<Arc<KvStoreGateway>>) {
        self.gateway = gateway.into();
    }

    pub fn gateway(&self) -> &Arc<KvStoreGateway> {
        &self.gateway
    }

    pub fn resolver(&self) -> &Arc<FsMux> {
        &self.resolver
    }

    /// Load every file directly under `location` whose name matches `pattern`
    ///
    /// Returns a map from the joined location of each file to its decoded
    /// value. Directories are never descended into and zero-byte files are
    /// left out.
    ///
    /// `pattern` uses `filepath.Match` syntax (`*`, `?`, `[a-z]`, `[^a]`, `\*`)
    /// against bare file names. A malformed pattern fails with
    /// [`ComfigError::InvalidPattern`] before the location is touched rather
    /// than matching nothing.
    pub fn generate_from_path<T, F>(
        &self,
        location: &str,
        pattern: &str,
        factory: F,
    ) -> ComfigResult<HashMap<String, T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> T,
    {
        let matcher = pattern::compile(pattern).map_err(|message| ComfigError::InvalidPattern {
            pattern: pattern.to_string(),
            message,
        })?;

        log_debug!(self.logger, "Resolving {}", location);
        let handle = self.resolver.lookup(location).map_err(|source| {
            log_warn!(self.logger, "Failed to resolve {}: {}", location, source);
            ComfigError::Resolution {
                location: location.to_string(),
                source,
            }
        })?;

        let entries = handle.read_dir().map_err(|source| ComfigError::Listing {
            location: location.to_string(),
            source,
        })?;

        let mut configs = HashMap::new();
        for entry in entries {
            if !self.should_load(&entry, &matcher, pattern) {
                continue;
            }

            let path = join_location(location, &entry.name);
            let bytes = read_entry(handle.as_ref(), &entry.name).map_err(|source| ComfigError::Read {
                path: path.clone(),
                source,
            })?;
            if bytes.is_empty() {
                log_debug!(self.logger, "Skipping empty file {}", path);
                continue;
            }

            let config = self.load(&path, &entry.name, bytes, &factory)?;
            log_debug!(self.logger, "Loaded {}", path);
            configs.insert(path, config);
        }

        log_info!(self.logger, "Loaded {} config(s) from {}", configs.len(), location);
        Ok(configs)
    }

    fn should_load(&self, entry: &FsEntry, matcher: &Pattern, pattern: &str) -> bool {
        if entry.is_dir {
            log_debug!(self.logger, "Skipping directory {}", entry.name);
            return false;
        }
        if !matcher.matches_with(&entry.name, MATCH_OPTIONS) {
            log_debug!(self.logger, "Skipping {}: does not match {}", entry.name, pattern);
            return false;
        }
        true
    }

    fn load<T, F>(&self, path: &str, name: &str, bytes: Vec<u8>, factory: &F) -> ComfigResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> T,
    {
        let source = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            let line = valid.iter().filter(|b| **b == b'\n').count() + 1;
            ComfigError::TemplateParse {
                path: path.to_string(),
                source: TemplateError::parse(name, line, "invalid UTF-8 in template source"),
            }
        })?;

        let template = Template::parse(name, &source).map_err(|source| {
            log_error!(self.logger, "Failed to parse {}: {}", path, source);
            ComfigError::TemplateParse {
                path: path.to_string(),
                source,
            }
        })?;

        let rendered = template
            .render(&GatewayContext::new(&self.gateway))
            .map_err(|source| {
                log_error!(self.logger, "Failed to render {}: {}", path, source);
                ComfigError::TemplateRender {
                    path: path.to_string(),
                    source,
                }
            })?;

        decode::decode_onto(factory(), &rendered).map_err(|source| ComfigError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for Comfigurator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comfigurator")
            .field("resolver", &self.resolver)
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

/// Read a whole file; a stream cut short counts as its end
fn read_entry(handle: &dyn Filesystem, name: &str) -> Result<Vec<u8>, FsError> {
    let mut reader = handle.open(name)?;
    let mut bytes = Vec::new();
    match reader.read_to_end(&mut bytes) {
        Ok(_) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(bytes),
        Err(e) => Err(FsError::Io(e)),
    }
}
