//! Manifest loading: YAML files or directories, optionally recursive.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::Manifest;

/// Load an ordered manifest from a file or directory. Directory entries are
/// visited in name order for a stable apply order; subdirectories are only
/// descended into when `recursive` is set.
pub fn load(path: &Path, recursive: bool) -> Result<Manifest> {
    let mut docs = Vec::new();
    if path.is_dir() {
        load_dir(path, recursive, &mut docs)?;
    } else {
        load_file(path, &mut docs)?;
    }
    debug!(path = %path.display(), resources = docs.len(), "manifest loaded");
    Manifest::new(docs)
}

/// Parse one multi-document YAML string into JSON resource trees,
/// skipping empty documents.
pub fn parse_docs(s: &str) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(s) {
        let v = serde_yaml::Value::deserialize(doc).context("parsing YAML document")?;
        if v.is_null() {
            continue;
        }
        let json = serde_json::to_value(v).context("converting YAML to JSON")?;
        out.push(json);
    }
    Ok(out)
}

fn load_dir(dir: &Path, recursive: bool, out: &mut Vec<Value>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("reading manifest dir {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                load_dir(&path, recursive, out)?;
            }
            continue;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => load_file(&path, out)?,
            _ => {}
        }
    }
    Ok(())
}

fn load_file(path: &Path, out: &mut Vec<Value>) -> Result<()> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("reading manifest file {}", path.display()))?;
    let docs =
        parse_docs(&s).with_context(|| format!("parsing manifest file {}", path.display()))?;
    out.extend(docs);
    Ok(())
}
