//! Pluggable filesystems that locations resolve to
//!
//! A location string (`file:///etc/app`, `./conf`, `https://host/conf/`,
//! `s3://bucket/conf`, `mem://volume`) is resolved by an [`FsMux`] to a [`Filesystem`] handle that
//! can list a directory and read its files. Backends implement
//! [`FilesystemProvider`] and register either on a mux directly or in the
//! global registry used by [`default_mux`].

mod blob;
mod http;
mod local;
mod memory;
mod mux;
mod registry;
mod traits;

pub use blob::{BlobFilesystem, BlobFsProvider};
pub use http::{HttpFilesystem, HttpFsOptions, HttpFsProvider};
pub use local::{LocalFilesystem, LocalFsProvider};
pub use memory::{MemoryFilesystem, MemoryFsProvider};
pub use mux::{parse_location, FsMux};
pub use registry::{
    create_filesystem_provider, default_mux, has_filesystem, list_filesystems, register_filesystem,
    unregister_filesystem, FilesystemDefinition, ProviderFactory,
};
pub use traits::{Filesystem, FilesystemProvider, FsEntry, FsError, FsResult};
