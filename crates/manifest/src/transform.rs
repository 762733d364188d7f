//! Transform pipeline: pure per-resource rewrites composed into a chain.

use serde_json::{json, Value};

use manta_core::install::{self, Install};
use manta_core::meta;

/// A pure rewrite applied to every manifest member. Transformers compose by
/// sequential application and must tolerate fields already rewritten by an
/// earlier link in the chain.
pub type Transformer = Box<dyn Fn(&mut Value) + Send + Sync>;

/// Stamp a back-reference to the owning Install record into
/// `metadata.ownerReferences`. Re-stamping replaces a previous Install
/// reference instead of appending, so the injector is idempotent.
pub fn owner_injector(owner: &Install) -> Transformer {
    let reference = json!({
        "apiVersion": install::API_VERSION,
        "kind": install::KIND,
        "name": owner.name,
        "uid": owner.uid.clone().unwrap_or_default(),
    });
    Box::new(move |v: &mut Value| {
        let Some(metadata) = meta::metadata_mut(v) else {
            return;
        };
        let refs = metadata
            .entry("ownerReferences".to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(arr) = refs.as_array_mut() {
            arr.retain(|r| r.get("kind").and_then(Value::as_str) != Some(install::KIND));
            arr.push(reference.clone());
        }
    })
}

/// Rewrite `metadata.namespace` unconditionally.
pub fn namespace_injector(ns: &str) -> Transformer {
    let ns = ns.to_string();
    Box::new(move |v: &mut Value| meta::set_namespace(v, &ns))
}
