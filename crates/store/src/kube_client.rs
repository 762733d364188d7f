//! Kube-backed object store: dynamic APIs resolved through discovery,
//! server-side apply with a fixed field manager.

use async_trait::async_trait;
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    discovery::{Discovery, Scope},
    Client,
};
use metrics::counter;
use serde_json::{json, Value};
use tracing::debug;

use manta_core::install::{self, Install};
use manta_core::{ResourceKey, StoreError};

use crate::ObjectStore;

/// Field manager for server-side apply patches.
pub const FIELD_MANAGER: &str = "manta-operator";

/// ApiResource for the Install record type.
pub fn install_api_resource() -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind {
        group: install::GROUP.to_string(),
        version: install::VERSION.to_string(),
        kind: install::KIND.to_string(),
    })
}

pub struct KubeStore {
    client: Client,
    discovery: Discovery,
}

impl KubeStore {
    /// Run discovery once; served resources are resolved against this
    /// snapshot for the lifetime of the store.
    pub async fn new(client: Client) -> Result<Self, StoreError> {
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(|e| StoreError::Transient(format!("discovery: {e}")))?;
        Ok(Self { client, discovery })
    }

    fn dynamic_api(&self, key: &ResourceKey) -> Result<Api<DynamicObject>, StoreError> {
        let (group, version) = match key.api_version.split_once('/') {
            Some((g, v)) => (g, v),
            None => ("", key.api_version.as_str()),
        };
        for g in self.discovery.groups() {
            for (ar, caps) in g.recommended_resources() {
                if ar.group == group && ar.version == version && ar.kind == key.kind {
                    return if matches!(caps.scope, Scope::Namespaced) {
                        match key.namespace.as_deref() {
                            Some(ns) => Ok(Api::namespaced_with(self.client.clone(), ns, &ar)),
                            None => Err(StoreError::Invalid(format!(
                                "namespace required for namespaced resource {key}"
                            ))),
                        }
                    } else {
                        Ok(Api::all_with(self.client.clone(), &ar))
                    };
                }
            }
        }
        Err(StoreError::NotFound(format!("no served resource for {key}")))
    }

    fn install_api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &install_api_resource())
    }
}

fn transient(e: kube::Error) -> StoreError {
    StoreError::Transient(e.to_string())
}

fn is_404(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(ae) if ae.code == 404)
}

fn to_json(obj: &DynamicObject) -> Result<Value, StoreError> {
    serde_json::to_value(obj).map_err(|e| StoreError::Invalid(e.to_string()))
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Value>, StoreError> {
        let api = self.dynamic_api(key)?;
        match api.get_opt(&key.name).await.map_err(transient)? {
            Some(obj) => Ok(Some(to_json(&obj)?)),
            None => Ok(None),
        }
    }

    async fn apply(&self, obj: &Value) -> Result<Value, StoreError> {
        let key = ResourceKey::from_json(obj)?;
        let api = self.dynamic_api(&key)?;
        let pp = PatchParams::apply(FIELD_MANAGER).force();
        let applied = match api.patch(&key.name, &pp, &Patch::Apply(obj)).await {
            Ok(o) => o,
            Err(e) => {
                counter!("apply_err", 1u64);
                return Err(transient(e));
            }
        };
        counter!("apply_ok", 1u64);
        debug!(key = %key, "applied");
        to_json(&applied)
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        // A GVK no longer served by the cluster counts as already deleted.
        let api = match self.dynamic_api(key) {
            Ok(api) => api,
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        match api.delete(&key.name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(ref e) if is_404(e) => Ok(()),
            Err(e) => Err(transient(e)),
        }
    }

    async fn list_installs(&self, namespace: &str) -> Result<Vec<Install>, StoreError> {
        let list = self
            .install_api(namespace)
            .list(&ListParams::default())
            .await
            .map_err(transient)?;
        list.items
            .iter()
            .map(|obj| Install::from_json(&to_json(obj)?))
            .collect()
    }

    async fn get_install(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Install>, StoreError> {
        match self
            .install_api(namespace)
            .get_opt(name)
            .await
            .map_err(transient)?
        {
            Some(obj) => Ok(Some(Install::from_json(&to_json(&obj)?)?)),
            None => Ok(None),
        }
    }

    async fn update_status(&self, install: &Install) -> Result<(), StoreError> {
        let patch = json!({ "status": install.status });
        match self
            .install_api(&install.namespace)
            .patch_status(&install.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(ref e) if is_404(e) => Err(StoreError::NotFound(install.key().to_string())),
            Err(e) => Err(transient(e)),
        }
    }
}
