//! Detects config keys nothing reads. A key is unused if it isn't itself a
//! registered pointer for the active [`RunMode`] and no ancestor of it is
//! either — that second clause is what lets a registration name a whole
//! subtree (`/broker`) instead of every leaf under it.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::app_config::RunMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Default)]
pub struct UnusedKeysReport {
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeysReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Pointers the running code actually reads in each mode. Keep this in sync
/// with what `AppConfig` and the secrets resolver consume — the whole point
/// of this registry is to catch the two drifting apart.
fn consumed_pointers(mode: RunMode) -> &'static [&'static str] {
    const BACKTEST: &[&str] = &["/runtime/mode", "/risk", "/allocator", "/resource_policy"];
    const PAPER: &[&str] = &[
        "/runtime/mode",
        "/risk",
        "/allocator",
        "/resource_policy",
        "/dedup",
        "/broker",
    ];
    const LIVE: &[&str] = &[
        "/runtime/mode",
        "/risk",
        "/allocator",
        "/resource_policy",
        "/dedup",
        "/broker",
    ];
    match mode {
        RunMode::Backtest => BACKTEST,
        RunMode::Paper => PAPER,
        RunMode::Live => LIVE,
    }
}

fn is_consumed(leaf_pointer: &str, consumed: &[&str]) -> bool {
    consumed
        .iter()
        .any(|c| leaf_pointer == *c || leaf_pointer.starts_with(&format!("{c}/")))
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, val) in map {
                collect_leaf_pointers(val, &format!("{prefix}/{k}"), out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, val) in arr.iter().enumerate() {
                collect_leaf_pointers(val, &format!("{prefix}/{i}"), out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

pub fn report_unused_keys(
    mode: RunMode,
    config_json: &Value,
    policy: UnusedKeyPolicy,
) -> Result<UnusedKeysReport> {
    let consumed = consumed_pointers(mode);
    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|l| !is_consumed(l, consumed))
        .collect();
    unused.sort();

    let report = UnusedKeysReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config key(s): {}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.join(", "),
        );
    }

    Ok(report)
}
