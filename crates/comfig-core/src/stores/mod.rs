//! Key-value stores and the layered gateway over them
//!
//! This module provides the lookup surface templates render against:
//! - `Store` trait for implementing custom stores
//! - Built-in implementations: `MemoryStore`, `EnvStore`, `YamlStore`
//! - `KvStoreGateway`, an ordered first-match chain of stores

mod traits;
mod memory_store;
mod env_store;
mod yaml_store;
mod gateway;

pub use traits::{Store, StoreError, StoreResult, StringMap};
pub use memory_store::MemoryStore;
pub use env_store::EnvStore;
pub use yaml_store::YamlStore;
pub use gateway::KvStoreGateway;
