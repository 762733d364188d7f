//! Object-store seam consumed by the reconciler.
//!
//! `KubeStore` talks to a live apiserver via dynamic discovery; `MemStore`
//! backs the test suite.

#![forbid(unsafe_code)]

mod kube_client;
mod mem;

pub use kube_client::{install_api_resource, KubeStore, FIELD_MANAGER};
pub use mem::MemStore;

use async_trait::async_trait;
use serde_json::Value;

use manta_core::install::Install;
use manta_core::{ResourceKey, StoreError};

/// Synchronous-feeling, bounded-latency object store operations. Retry and
/// backoff on `Transient` errors belong to the trigger subsystem, not here.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a live object. Absent is `None`, not an error.
    async fn get(&self, key: &ResourceKey) -> Result<Option<Value>, StoreError>;

    /// Create-or-update. Field-merge semantics belong to the implementation.
    async fn apply(&self, obj: &Value) -> Result<Value, StoreError>;

    /// Delete by identity. Deleting an absent object is success.
    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError>;

    /// List Install records in a namespace.
    async fn list_installs(&self, namespace: &str) -> Result<Vec<Install>, StoreError>;

    /// Fetch one Install record. Absent is `None`.
    async fn get_install(&self, namespace: &str, name: &str)
        -> Result<Option<Install>, StoreError>;

    /// Persist the record's status subresource.
    async fn update_status(&self, install: &Install) -> Result<(), StoreError>;
}
