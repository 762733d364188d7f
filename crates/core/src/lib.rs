//! Manta core types: resource identity, value-tree accessors, shared errors.

#![forbid(unsafe_code)]

pub mod install;
pub mod meta;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Version tag stamped into `Install` status after a successful apply pass.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identity of a managed resource: (apiVersion, kind, namespace, name).
/// Unique within one manifest snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ResourceKey {
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceKey {
    pub fn new(api_version: &str, kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            namespace: namespace.map(|s| s.to_string()),
            name: name.to_string(),
        }
    }

    /// Read the identity tuple out of a resource tree.
    pub fn from_json(v: &Value) -> Result<Self, StoreError> {
        let api_version = meta::api_version(v)
            .ok_or_else(|| StoreError::Invalid("resource missing apiVersion".into()))?;
        let kind = meta::kind(v)
            .ok_or_else(|| StoreError::Invalid("resource missing kind".into()))?;
        let name = meta::name(v)
            .ok_or_else(|| StoreError::Invalid("resource missing metadata.name".into()))?;
        Ok(Self::new(api_version, kind, meta::namespace(v), name))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} {}/{}", self.api_version, self.kind, ns, self.name),
            None => write!(f, "{}/{} {}", self.api_version, self.kind, self.name),
        }
    }
}

/// Object-store error taxonomy. Absence is encoded as `Option`/`Ok` on the
/// calls where it is not an error (get, delete); `NotFound` is reserved for
/// the cases where a target was required to exist.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid object: {0}")]
    Invalid(String),
    #[error("transient store error: {0}")]
    Transient(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_from_json_reads_identity() {
        let v = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "controller", "namespace": "serving" }
        });
        let key = ResourceKey::from_json(&v).unwrap();
        assert_eq!(key.api_version, "apps/v1");
        assert_eq!(key.kind, "Deployment");
        assert_eq!(key.namespace.as_deref(), Some("serving"));
        assert_eq!(key.name, "controller");
        assert_eq!(key.to_string(), "apps/v1/Deployment serving/controller");
    }

    #[test]
    fn key_from_json_rejects_incomplete_objects() {
        let v = json!({ "kind": "Deployment", "metadata": { "name": "x" } });
        let e = ResourceKey::from_json(&v).unwrap_err().to_string();
        assert!(e.contains("missing apiVersion"), "e={}", e);

        let v = json!({ "apiVersion": "v1", "kind": "ConfigMap", "metadata": {} });
        let e = ResourceKey::from_json(&v).unwrap_err().to_string();
        assert!(e.contains("missing metadata.name"), "e={}", e);
    }

    #[test]
    fn key_serializes_camel_case() {
        let key = ResourceKey::new("v1", "Service", None, "gateway");
        let v = serde_json::to_value(&key).unwrap();
        assert_eq!(v, json!({ "apiVersion": "v1", "kind": "Service", "name": "gateway" }));
    }
}
