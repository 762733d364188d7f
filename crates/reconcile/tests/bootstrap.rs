#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;

use manta_core::install::Install;
use manta_reconcile::bootstrap;
use manta_store::MemStore;

fn bootstrap_cr(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("install_cr.yaml");
    fs::write(
        &path,
        "apiVersion: operator.manta.dev/v1alpha1\nkind: Install\nmetadata:\n  name: default\n",
    )
    .unwrap();
    path
}

#[tokio::test]
async fn seeds_a_record_when_none_exist() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemStore::new();

    bootstrap::run(&store, &bootstrap_cr(&dir), "serving").await;

    let created = store.install("serving", "default").unwrap();
    assert_eq!(created.namespace, "serving");
}

#[tokio::test]
async fn leaves_existing_records_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemStore::new();
    store.put_install(Install {
        namespace: "serving".into(),
        name: "existing".into(),
        ..Default::default()
    });

    bootstrap::run(&store, &bootstrap_cr(&dir), "serving").await;

    assert!(store.applied_log().is_empty());
    assert!(store.install("serving", "default").is_none());
}

#[tokio::test]
async fn missing_manifest_is_logged_not_fatal() {
    let store = MemStore::new();
    bootstrap::run(&store, std::path::Path::new("does/not/exist.yaml"), "serving").await;
    assert!(store.applied_log().is_empty());
}
