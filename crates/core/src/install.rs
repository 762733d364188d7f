//! The `Install` record: desired state for one managed installation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{meta, ResourceKey, StoreError};

pub const GROUP: &str = "operator.manta.dev";
pub const VERSION: &str = "v1alpha1";
pub const KIND: &str = "Install";
pub const API_VERSION: &str = "operator.manta.dev/v1alpha1";

/// Desired state. `namespace` is the target namespace for the manifest
/// (empty means "leave as templated"); `config` maps a ConfigMap name suffix
/// to entry overrides. BTreeMap keeps the Configure stage order deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, BTreeMap<String, String>>,
}

/// Observed state: identities applied by the last successful pass and the
/// controller version that produced them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallStatus {
    #[serde(default)]
    pub resources: Vec<ResourceKey>,
    #[serde(default)]
    pub version: String,
}

/// Typed view of an Install record, parsed from its dynamic JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Install {
    pub namespace: String,
    pub name: String,
    pub uid: Option<String>,
    pub spec: InstallSpec,
    pub status: InstallStatus,
}

impl Install {
    pub fn from_json(v: &Value) -> Result<Self, StoreError> {
        let name = meta::name(v)
            .ok_or_else(|| StoreError::Invalid("install missing metadata.name".into()))?
            .to_string();
        let namespace = meta::namespace(v).unwrap_or_default().to_string();
        let uid = meta::nested_str(v, &["metadata", "uid"]).map(|s| s.to_string());
        let spec = match v.get("spec") {
            Some(s) => serde_json::from_value(s.clone())
                .map_err(|e| StoreError::Invalid(format!("install spec: {e}")))?,
            None => InstallSpec::default(),
        };
        let status = match v.get("status") {
            Some(s) => serde_json::from_value(s.clone())
                .map_err(|e| StoreError::Invalid(format!("install status: {e}")))?,
            None => InstallStatus::default(),
        };
        Ok(Self { namespace, name, uid, spec, status })
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(API_VERSION, KIND, Some(&self.namespace), &self.name)
    }

    /// JSON form suitable for create/apply of the record itself.
    pub fn to_json(&self) -> Value {
        json!({
            "apiVersion": API_VERSION,
            "kind": KIND,
            "metadata": { "name": self.name, "namespace": self.namespace },
            "spec": self.spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_from_json_parses_spec_and_status() {
        let v = json!({
            "apiVersion": API_VERSION,
            "kind": KIND,
            "metadata": { "name": "default", "namespace": "serving", "uid": "abc-123" },
            "spec": {
                "namespace": "target",
                "config": { "logging": { "level": "debug" } }
            },
            "status": {
                "resources": [ { "apiVersion": "v1", "kind": "Service", "name": "s" } ],
                "version": "0.1.0"
            }
        });
        let inst = Install::from_json(&v).unwrap();
        assert_eq!(inst.name, "default");
        assert_eq!(inst.namespace, "serving");
        assert_eq!(inst.uid.as_deref(), Some("abc-123"));
        assert_eq!(inst.spec.namespace, "target");
        assert_eq!(inst.spec.config["logging"]["level"], "debug");
        assert_eq!(inst.status.resources.len(), 1);
        assert_eq!(inst.status.version, "0.1.0");
    }

    #[test]
    fn install_from_json_defaults_missing_sections() {
        let v = json!({
            "apiVersion": API_VERSION,
            "kind": KIND,
            "metadata": { "name": "bare" }
        });
        let inst = Install::from_json(&v).unwrap();
        assert!(inst.spec.namespace.is_empty());
        assert!(inst.spec.config.is_empty());
        assert!(inst.status.resources.is_empty());
    }

    #[test]
    fn to_json_round_trips_spec() {
        let mut inst = Install {
            namespace: "serving".into(),
            name: "default".into(),
            ..Default::default()
        };
        inst.spec.namespace = "target".into();
        let v = inst.to_json();
        let back = Install::from_json(&v).unwrap();
        assert_eq!(back.spec, inst.spec);
        assert_eq!(back.name, "default");
    }
}
