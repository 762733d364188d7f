//! Removal of resources created by earlier manifest generations that the
//! current generation no longer manages.

use tracing::debug;

use manta_core::{ResourceKey, StoreError};
use manta_store::ObjectStore;

const LEGACY_NAMESPACE: &str = "istio-system";
const LEGACY_NAME: &str = "knative-ingressgateway";

/// The fixed legacy triplet. Not derived from the manifest or spec.
pub fn legacy_keys() -> [ResourceKey; 3] {
    [
        ResourceKey::new("v1", "Service", Some(LEGACY_NAMESPACE), LEGACY_NAME),
        ResourceKey::new("apps/v1", "Deployment", Some(LEGACY_NAMESPACE), LEGACY_NAME),
        ResourceKey::new(
            "autoscaling/v1",
            "HorizontalPodAutoscaler",
            Some(LEGACY_NAMESPACE),
            LEGACY_NAME,
        ),
    ]
}

/// Delete the legacy triplet, every pass. Absent resources are success; the
/// first real failure aborts.
pub async fn delete_obsolete(store: &dyn ObjectStore) -> Result<(), StoreError> {
    for key in legacy_keys() {
        store.delete(&key).await?;
        debug!(key = %key, "pruned obsolete resource");
    }
    Ok(())
}
