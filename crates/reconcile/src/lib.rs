//! Install reconciliation: one idempotent pass from desired record to live
//! cluster state.
//!
//! Stage order is fixed: transform before apply (resources must be owned and
//! namespaced before creation), prune after apply (a resource re-created this
//! pass must not be swept), configure last (operator overrides win over the
//! base manifest).

#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod configure;
pub mod prune;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{info, warn};

use manta_core::install::Install;
use manta_core::{StoreError, VERSION};
use manta_manifest::transform::{namespace_injector, owner_injector, Transformer};
use manta_manifest::Manifest;
use manta_store::ObjectStore;

/// Factory producing platform-specific transformers, evaluated once per pass
/// in registration order, after the owner and namespace injectors.
pub type TransformerFactory = Box<dyn Fn(&Install) -> Vec<Transformer> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("composition: {0}")]
    Composition(String),
}

pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    base: Manifest,
    /// Last transformed manifest; the teardown target when the record is gone.
    current: Mutex<Manifest>,
    platform: Vec<TransformerFactory>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ObjectStore>, base: Manifest) -> Self {
        let current = Mutex::new(base.clone());
        Self { store, base, current, platform: Vec::new() }
    }

    pub fn with_platform_transformers(mut self, factories: Vec<TransformerFactory>) -> Self {
        self.platform = factories;
        self
    }

    /// One full pass for the record at (namespace, name). Any stage failure
    /// aborts the remaining stages; the caller schedules the retry.
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        let t0 = Instant::now();
        counter!("reconcile_attempts", 1u64);
        let res = self.run(namespace, name).await;
        histogram!("reconcile_latency_ms", t0.elapsed().as_secs_f64() * 1000.0);
        match &res {
            Ok(()) => counter!("reconcile_ok", 1u64),
            Err(e) => {
                warn!(namespace, name, error = %e, "reconcile failed");
                counter!("reconcile_err", 1u64);
            }
        }
        res
    }

    async fn run(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        info!(namespace, name, "reconciling install");
        let Some(mut install) = self.store.get_install(namespace, name).await? else {
            return self.teardown(namespace, name).await;
        };

        let manifest = self.transform(&install);
        self.apply(&mut install, &manifest).await?;
        prune::delete_obsolete(self.store.as_ref()).await?;
        configure::run(self.store.as_ref(), &manifest, &install).await?;
        Ok(())
    }

    /// The record is gone: delete everything the manifest store knows about,
    /// in its last transformed shape.
    async fn teardown(&self, namespace: &str, name: &str) -> Result<(), ReconcileError> {
        info!(namespace, name, "install record gone; deleting managed resources");
        let manifest = self.current_manifest();
        manifest.delete_all(self.store.as_ref()).await?;
        Ok(())
    }

    /// Build the transformer chain and run it over a fresh copy of the base
    /// manifest. Pure; no I/O.
    fn transform(&self, install: &Install) -> Manifest {
        let mut chain: Vec<Transformer> = vec![owner_injector(install)];
        if !install.spec.namespace.is_empty() {
            chain.push(namespace_injector(&install.spec.namespace));
        }
        for factory in &self.platform {
            chain.extend(factory(install));
        }
        let mut manifest = self.base.clone();
        manifest.transform(&chain);
        self.set_current(manifest.clone());
        manifest
    }

    /// Apply every resource in manifest order, then record the applied
    /// identities and version tag into the record's status.
    async fn apply(&self, install: &mut Install, manifest: &Manifest) -> Result<(), ReconcileError> {
        manifest.apply_all(self.store.as_ref()).await?;
        install.status.resources = manifest.keys();
        install.status.version = VERSION.to_string();
        self.store.update_status(install).await?;
        Ok(())
    }

    fn current_manifest(&self) -> Manifest {
        match self.current.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_current(&self, manifest: Manifest) {
        match self.current.lock() {
            Ok(mut g) => *g = manifest,
            Err(poisoned) => *poisoned.into_inner() = manifest,
        }
    }
}
