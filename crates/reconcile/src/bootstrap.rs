//! Best-effort creation of a default Install record at controller startup.

use std::path::Path;

use tracing::{error, info};

use manta_manifest::transform::namespace_injector;
use manta_manifest::{loader, Manifest};
use manta_store::ObjectStore;

/// Manifest seeding the default Install record, relative to the process
/// working directory.
pub const BOOTSTRAP_MANIFEST: &str = "deploy/crds/install_cr.yaml";

/// Ensure at least one Install record exists in `namespace`. Every failure is
/// logged and swallowed; the list-before-create check is best-effort, and a
/// record created concurrently by an external actor is a benign duplicate for
/// a later reconcile to converge.
pub async fn run(store: &dyn ObjectStore, manifest_path: &Path, namespace: &str) {
    info!(namespace, "automatic install requested");
    let installs = match store.list_installs(namespace).await {
        Ok(list) => list,
        Err(e) => {
            error!(error = %e, "unable to list installs");
            return;
        }
    };
    if let Some(existing) = installs.first() {
        info!(name = %existing.name, "install found");
        return;
    }
    let mut manifest: Manifest = match loader::load(manifest_path, false) {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, "unable to load bootstrap manifest");
            return;
        }
    };
    manifest.transform(&[namespace_injector(namespace)]);
    if let Err(e) = manifest.apply_all(store).await {
        error!(error = %e, "unable to create install");
    }
}
