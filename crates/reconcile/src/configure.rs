//! Config merge: overlay spec-provided entries onto managed ConfigMaps
//! without disturbing unspecified keys.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{info, warn};

use manta_core::install::Install;
use manta_core::{meta, ResourceKey};
use manta_manifest::Manifest;
use manta_store::ObjectStore;

use crate::ReconcileError;

/// Naming rule linking a spec override suffix to its managed ConfigMap.
fn config_name(suffix: &str) -> String {
    format!("config-{suffix}")
}

/// Process every (suffix, overrides) pair in spec order. A target missing
/// from the manifest or the cluster is a warning, not a failure: overrides
/// may address components that are not installed. Transient store errors
/// still abort.
pub async fn run(
    store: &dyn ObjectStore,
    manifest: &Manifest,
    install: &Install,
) -> Result<(), ReconcileError> {
    for (suffix, overrides) in &install.spec.config {
        let name = config_name(suffix);
        let Some(entry) = manifest.find("v1", "ConfigMap", &name) else {
            warn!(configmap = %name, "override target not in manifest; skipping");
            continue;
        };
        let key = ResourceKey::from_json(entry)
            .map_err(|e| ReconcileError::Composition(e.to_string()))?;
        let Some(live) = store.get(&key).await? else {
            warn!(configmap = %name, "override target not found in cluster; skipping");
            continue;
        };
        merge(store, live, overrides).await?;
    }
    Ok(())
}

/// Overlay `overrides` onto the ConfigMap's `data`, logging each changed key
/// with its previous value. Exactly one apply call is issued per invocation,
/// even when nothing changed. Returns the number of keys that changed.
pub async fn merge(
    store: &dyn ObjectStore,
    mut cm: Value,
    overrides: &BTreeMap<String, String>,
) -> Result<usize, ReconcileError> {
    let name = meta::name(&cm).unwrap_or_default().to_string();
    let mut changed = 0usize;
    for (key, value) in overrides {
        match meta::nested_str(&cm, &["data", key]) {
            Some(existing) if existing == value => continue,
            Some(existing) => {
                info!(configmap = %name, key = %key, value = %value, previous = %existing, "setting config entry");
            }
            None => {
                info!(configmap = %name, key = %key, value = %value, "setting config entry");
            }
        }
        meta::set_nested_str(&mut cm, &["data", key], value);
        changed += 1;
    }
    store.apply(&cm).await?;
    Ok(changed)
}
