#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use manta_reconcile::configure;
use manta_store::MemStore;
use serde_json::json;

fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn cm() -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": "config-observability", "namespace": "target" },
        "data": { "a": "1", "b": "2" }
    })
}

#[tokio::test]
async fn merge_overlays_only_named_keys() {
    let store = MemStore::new();
    let key = store.insert_object(cm());

    let changed = configure::merge(&store, cm(), &overrides(&[("b", "3")]))
        .await
        .unwrap();
    assert_eq!(changed, 1);

    let live = store.object(&key).unwrap();
    assert_eq!(live["data"], json!({ "a": "1", "b": "3" }));
}

#[tokio::test]
async fn merge_is_silent_but_still_applies_when_unchanged() {
    let store = MemStore::new();
    let key = store.insert_object(cm());
    let wanted = overrides(&[("b", "3")]);

    let first = configure::merge(&store, cm(), &wanted).await.unwrap();
    assert_eq!(first, 1);
    let live = store.object(&key).unwrap();

    // same override against the already-merged object: nothing changes,
    // exactly one more apply call goes out
    let before = store.applied_log().len();
    let second = configure::merge(&store, live, &wanted).await.unwrap();
    assert_eq!(second, 0);
    assert_eq!(store.applied_log().len(), before + 1);
    assert_eq!(store.object(&key).unwrap()["data"], json!({ "a": "1", "b": "3" }));
}

#[tokio::test]
async fn merge_adds_absent_keys() {
    let store = MemStore::new();
    let key = store.insert_object(cm());

    let changed = configure::merge(&store, cm(), &overrides(&[("c", "9")]))
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        store.object(&key).unwrap()["data"],
        json!({ "a": "1", "b": "2", "c": "9" })
    );
}

#[tokio::test]
async fn merge_propagates_apply_failures() {
    let store = MemStore::new();
    store.insert_object(cm());
    store.fail_apply_on_kind("ConfigMap");

    let err = configure::merge(&store, cm(), &overrides(&[("b", "3")]))
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("injected apply failure"), "err={}", err);
}
