//! Comfig Core
//!
//! Templated configuration discovery. A directory of YAML files (on disk,
//! over HTTP, in an S3 bucket, or in memory) is listed, each file whose name matches a glob is
//! rendered as a template against a chain of key-value stores, and the result
//! is decoded into a typed config object.
//!
//! ## Stores
//!
//! The `stores` module provides the values templates read:
//! - `MemoryStore`, `EnvStore`, `YamlStore` implement `Store`
//! - `KvStoreGateway` chains stores; the first store holding a key wins
//!
//! ```rust,ignore
//! use comfig_core::{Comfigurator, EnvStore, KvStoreGateway, YamlStore};
//!
//! let mut gateway = KvStoreGateway::new();
//! gateway.add_store(Arc::new(EnvStore::with_prefix("APP")));
//! gateway.add_store(Arc::new(YamlStore::user("app")?));
//!
//! let mut comfigurator = Comfigurator::new();
//! comfigurator.set_gateway(gateway);
//! let services = comfigurator.generate_from_path("./services", "*.yml", ServiceConfig::default)?;
//! ```

pub mod comfigurator;
pub mod fs;
pub mod logging;
pub mod stores;
pub mod template;

pub use comfigurator::{join_location, ComfigError, ComfigResult, Comfigurator};

pub use stores::{
    EnvStore, KvStoreGateway, MemoryStore, Store, StoreError, StoreResult, StringMap, YamlStore,
};

pub use fs::{
    default_mux, list_filesystems, register_filesystem, unregister_filesystem, BlobFsProvider,
    Filesystem, FilesystemProvider, FsEntry, FsError, FsMux, FsResult, HttpFsOptions,
    MemoryFsProvider,
};

pub use logging::{Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use template::{GatewayContext, Template, TemplateData, TemplateError};
