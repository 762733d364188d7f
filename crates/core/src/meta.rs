//! Typed accessors over unstructured resource trees.
//!
//! Resources stay as raw `serde_json::Value`; these helpers cover the edges
//! the reconciler actually touches (apiVersion/kind/metadata/data.*).

use serde_json::{Map, Value};

pub fn api_version(v: &Value) -> Option<&str> {
    v.get("apiVersion").and_then(Value::as_str)
}

pub fn kind(v: &Value) -> Option<&str> {
    v.get("kind").and_then(Value::as_str)
}

pub fn name(v: &Value) -> Option<&str> {
    nested_str(v, &["metadata", "name"])
}

pub fn namespace(v: &Value) -> Option<&str> {
    nested_str(v, &["metadata", "namespace"])
}

/// Mutable view of `metadata`, created as an empty object if absent.
/// Returns `None` when the resource itself is not an object.
pub fn metadata_mut(v: &mut Value) -> Option<&mut Map<String, Value>> {
    let obj = v.as_object_mut()?;
    obj.entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

pub fn set_namespace(v: &mut Value, ns: &str) {
    if let Some(meta) = metadata_mut(v) {
        meta.insert("namespace".to_string(), Value::String(ns.to_string()));
    }
}

/// Walk a path of object keys and return the string leaf, if any.
pub fn nested_str<'a>(v: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut cur = v;
    for p in path {
        cur = cur.get(p)?;
    }
    cur.as_str()
}

/// Set a string leaf, creating intermediate objects as needed. Existing
/// sibling keys are left untouched; a non-object in the path is a no-op.
pub fn set_nested_str(v: &mut Value, path: &[&str], val: &str) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cur = v;
    for p in parents {
        let map = match cur.as_object_mut() {
            Some(m) => m,
            None => return,
        };
        cur = map
            .entry((*p).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(map) = cur.as_object_mut() {
        map.insert((*last).to_string(), Value::String(val.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_str_walks_objects() {
        let v = json!({ "data": { "logging.level": "debug" } });
        assert_eq!(nested_str(&v, &["data", "logging.level"]), Some("debug"));
        assert_eq!(nested_str(&v, &["data", "missing"]), None);
        assert_eq!(nested_str(&v, &["data"]), None);
    }

    #[test]
    fn set_nested_str_creates_path_and_preserves_siblings() {
        let mut v = json!({ "data": { "keep": "me" } });
        set_nested_str(&mut v, &["data", "new"], "value");
        assert_eq!(v, json!({ "data": { "keep": "me", "new": "value" } }));

        let mut empty = json!({});
        set_nested_str(&mut empty, &["data", "k"], "v");
        assert_eq!(empty, json!({ "data": { "k": "v" } }));
    }

    #[test]
    fn set_namespace_creates_metadata() {
        let mut v = json!({ "apiVersion": "v1", "kind": "ConfigMap" });
        set_namespace(&mut v, "serving");
        assert_eq!(namespace(&v), Some("serving"));

        // overwrite wins
        set_namespace(&mut v, "other");
        assert_eq!(namespace(&v), Some("other"));
    }
}
