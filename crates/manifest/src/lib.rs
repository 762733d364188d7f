//! Ordered manifest store: the unit the transform pipeline mutates and the
//! reconciler applies.

#![forbid(unsafe_code)]

pub mod loader;
pub mod transform;

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde_json::Value;
use tracing::debug;

use manta_core::{meta, ResourceKey, StoreError};
use manta_store::ObjectStore;
use transform::Transformer;

/// Ordered set of resource trees. Order is apply order and is preserved by
/// transforms; identity tuples are unique within one manifest.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    resources: Vec<Value>,
}

impl Manifest {
    /// Validate identities and build a manifest. Rejects members without an
    /// (apiVersion, kind, metadata.name) identity and duplicate tuples.
    pub fn new(resources: Vec<Value>) -> Result<Self> {
        let mut seen: HashSet<ResourceKey> = HashSet::new();
        for r in &resources {
            let key = ResourceKey::from_json(r)?;
            if !seen.insert(key.clone()) {
                bail!("duplicate resource in manifest: {key}");
            }
        }
        Ok(Self { resources })
    }

    /// Parse a (possibly multi-document) YAML string.
    pub fn from_yaml(s: &str) -> Result<Self> {
        Self::new(loader::parse_docs(s)?)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.resources.iter()
    }

    /// Ordered identity tuples, suitable for status reporting.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.resources
            .iter()
            .filter_map(|r| ResourceKey::from_json(r).ok())
            .collect()
    }

    /// First member matching (apiVersion, kind, name), regardless of namespace.
    pub fn find(&self, api_version: &str, kind: &str, name: &str) -> Option<&Value> {
        self.resources.iter().find(|r| {
            meta::api_version(r) == Some(api_version)
                && meta::kind(r) == Some(kind)
                && meta::name(r) == Some(name)
        })
    }

    /// Run every member through the full transformer chain, in place.
    /// Membership and order are untouched; only fields change.
    pub fn transform(&mut self, chain: &[Transformer]) {
        for r in &mut self.resources {
            for t in chain {
                t(r);
            }
        }
    }

    /// Apply members in manifest order. The first failure aborts; members
    /// past it are not attempted.
    pub async fn apply_all(&self, store: &dyn ObjectStore) -> Result<(), StoreError> {
        for r in &self.resources {
            store.apply(r).await?;
        }
        debug!(resources = self.resources.len(), "manifest applied");
        Ok(())
    }

    /// Delete members in reverse apply order. Absent resources are success.
    pub async fn delete_all(&self, store: &dyn ObjectStore) -> Result<(), StoreError> {
        for r in self.resources.iter().rev() {
            let key = ResourceKey::from_json(r)?;
            store.delete(&key).await?;
        }
        debug!(resources = self.resources.len(), "manifest deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTI: &str = r#"
apiVersion: v1
kind: ServiceAccount
metadata:
  name: controller
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: controller
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: config-logging
data:
  level: info
"#;

    #[test]
    fn from_yaml_preserves_document_order() {
        let m = Manifest::from_yaml(MULTI).unwrap();
        let kinds: Vec<_> = m.keys().into_iter().map(|k| k.kind).collect();
        assert_eq!(kinds, ["ServiceAccount", "Deployment", "ConfigMap"]);
    }

    #[test]
    fn duplicate_identity_is_rejected() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: dup
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: dup
"#;
        let e = Manifest::from_yaml(yaml).unwrap_err().to_string();
        assert!(e.contains("duplicate resource"), "e={}", e);
    }

    #[test]
    fn find_matches_api_version_kind_name() {
        let m = Manifest::from_yaml(MULTI).unwrap();
        assert!(m.find("v1", "ConfigMap", "config-logging").is_some());
        assert!(m.find("v1", "ConfigMap", "config-missing").is_none());
        assert!(m.find("apps/v1", "Deployment", "controller").is_some());
        // kind alone is not enough
        assert!(m.find("v1", "Deployment", "controller").is_none());
    }

    #[test]
    fn transform_mutates_fields_but_not_membership() {
        let mut m = Manifest::from_yaml(MULTI).unwrap();
        let before: Vec<_> = m.keys().into_iter().map(|k| (k.kind, k.name)).collect();
        m.transform(&[transform::namespace_injector("serving")]);
        let after = m.keys();
        assert_eq!(after.len(), before.len());
        for (key, (kind, name)) in after.iter().zip(before.iter()) {
            assert_eq!(&key.kind, kind);
            assert_eq!(&key.name, name);
            assert_eq!(key.namespace.as_deref(), Some("serving"));
        }
    }
}
