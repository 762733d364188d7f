//! In-memory object store used by the reconciler test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use manta_core::install::{self, Install};
use manta_core::{meta, ResourceKey, StoreError};

use crate::ObjectStore;

#[derive(Default)]
struct Inner {
    objects: HashMap<ResourceKey, Value>,
    installs: BTreeMap<(String, String), Install>,
    applied: Vec<ResourceKey>,
    deleted: Vec<ResourceKey>,
    fail_apply_kind: Option<String>,
}

/// Object store backed by hash maps, with an apply/delete log and a
/// fail-on-kind injection knob.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed a live object without touching the logs.
    pub fn insert_object(&self, obj: Value) -> ResourceKey {
        let key = ResourceKey::from_json(&obj).unwrap_or_else(|e| panic!("seed object: {e}"));
        self.lock().objects.insert(key.clone(), obj);
        key
    }

    pub fn object(&self, key: &ResourceKey) -> Option<Value> {
        self.lock().objects.get(key).cloned()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().objects.contains_key(key)
    }

    pub fn objects_len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn put_install(&self, install: Install) {
        self.lock()
            .installs
            .insert((install.namespace.clone(), install.name.clone()), install);
    }

    pub fn remove_install(&self, namespace: &str, name: &str) {
        self.lock()
            .installs
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn install(&self, namespace: &str, name: &str) -> Option<Install> {
        self.lock()
            .installs
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Every apply call in order, including no-op re-applies.
    pub fn applied_log(&self) -> Vec<ResourceKey> {
        self.lock().applied.clone()
    }

    /// Every delete call in order, including deletes of absent objects.
    pub fn deleted_log(&self) -> Vec<ResourceKey> {
        self.lock().deleted.clone()
    }

    /// Make every subsequent apply of the given kind fail with a transient
    /// error.
    pub fn fail_apply_on_kind(&self, kind: &str) {
        self.lock().fail_apply_kind = Some(kind.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn get(&self, key: &ResourceKey) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().objects.get(key).cloned())
    }

    async fn apply(&self, obj: &Value) -> Result<Value, StoreError> {
        let key = ResourceKey::from_json(obj)?;
        let mut inner = self.lock();
        if inner.fail_apply_kind.as_deref() == Some(key.kind.as_str()) {
            return Err(StoreError::Transient(format!(
                "injected apply failure for {key}"
            )));
        }
        inner.applied.push(key.clone());
        inner.objects.insert(key.clone(), obj.clone());
        // Applying an Install record registers it like a create would.
        if key.kind == install::KIND && meta::api_version(obj) == Some(install::API_VERSION) {
            let record = Install::from_json(obj)?;
            inner
                .installs
                .insert((record.namespace.clone(), record.name.clone()), record);
        }
        Ok(obj.clone())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.deleted.push(key.clone());
        inner.objects.remove(key);
        Ok(())
    }

    async fn list_installs(&self, namespace: &str) -> Result<Vec<Install>, StoreError> {
        Ok(self
            .lock()
            .installs
            .values()
            .filter(|i| i.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_install(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Install>, StoreError> {
        Ok(self.install(namespace, name))
    }

    async fn update_status(&self, install: &Install) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner
            .installs
            .get_mut(&(install.namespace.clone(), install.name.clone()))
        {
            Some(existing) => {
                existing.status = install.status.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(install.key().to_string())),
        }
    }
}
