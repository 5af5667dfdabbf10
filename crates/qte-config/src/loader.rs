//! Layered TOML config loading: an optional file's values override the
//! baked-in defaults; the merged tree is scanned for accidentally-embedded
//! secret values, then canonicalized (stable key order) and hashed so the
//! daemon can log one short value that identifies exactly what config it
//! booted with.

use std::fs;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Merge TOML documents in order (later documents override earlier ones),
/// then canonicalize and hash the result.
pub fn load_layered_toml_from_strings(docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for doc in docs {
        let toml_val: toml::Value = toml::from_str(doc).context("parse toml config layer")?;
        let json_val = serde_json::to_value(toml_val).context("toml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }
    finish(merged)
}

/// Same as [`load_layered_toml_from_strings`] but reads each layer from disk.
pub fn load_layered_toml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut contents = Vec::with_capacity(paths.len());
    for p in paths {
        contents.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let borrowed: Vec<&str> = contents.iter().map(String::as_str).collect();
    load_layered_toml_from_strings(&borrowed)
}

fn finish(merged: Value) -> Result<LoadedConfig> {
    scan_for_secrets(&merged, "")?;
    let canonical = canonicalize_json(&merged);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let config_hash = hex::encode(hasher.finalize());
    Ok(LoadedConfig {
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash,
    })
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Config files store env var NAMES, never values. A literal-looking secret
/// anywhere in the merged tree is a misconfiguration, not something to load
/// and redact later.
const SUSPICIOUS_PREFIXES: &[&str] = &["sk-", "AKIA", "ghp_", "xox"];

fn looks_like_secret(s: &str) -> bool {
    s.contains("PRIVATE KEY") || SUSPICIOUS_PREFIXES.iter().any(|p| s.starts_with(p))
}

fn scan_for_secrets(v: &Value, pointer: &str) -> Result<()> {
    match v {
        Value::Object(map) => {
            for (k, val) in map {
                scan_for_secrets(val, &format!("{pointer}/{k}"))?;
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                scan_for_secrets(val, &format!("{pointer}/{i}"))?;
            }
        }
        Value::String(s) => {
            if looks_like_secret(s) {
                bail!(
                    "CONFIG_SECRET_DETECTED: literal secret-like value at '{pointer}' — \
                     store an env var NAME there instead"
                );
            }
        }
        _ => {}
    }
    Ok(())
}
