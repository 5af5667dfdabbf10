//! Configuration loading for the trading control plane: a typed
//! [`AppConfig`] layered from baked-in defaults, an optional TOML file, and
//! a handful of environment overrides, plus the secrets resolver and
//! unused-key auditing that keep that config honest.

pub mod app_config;
pub mod loader;
pub mod secrets;
pub mod unused_keys;

pub use app_config::{
    AllocatorConfig, AppConfig, BrokerConfig, BrokerKeysEnv, DedupConfig, ResourcePolicyConfig,
    RunMode, RuntimeConfig,
};
pub use loader::{load_layered_toml, load_layered_toml_from_strings, LoadedConfig};
pub use secrets::{resolve_secrets_for_mode, ResolvedSecrets};
pub use unused_keys::{report_unused_keys, UnusedKeyPolicy, UnusedKeysReport};

use anyhow::Result;

/// Everything `main()` needs to finish booting: the typed config, the
/// resolved secrets for its run mode, and the raw loaded tree (for logging
/// `config_hash`).
pub struct LoadResult {
    pub config: AppConfig,
    pub secrets: ResolvedSecrets,
    pub loaded: LoadedConfig,
}

/// Load config: defaults, then `file_path` if given, then env overrides
/// (`PAPER_TRADING`, `ZERODHA_SANDBOX_MODE`). Audits unused keys under
/// `unused_key_policy` and resolves secrets for the resulting run mode.
pub fn load(file_path: Option<&str>, unused_key_policy: UnusedKeyPolicy) -> Result<LoadResult> {
    let loaded = match file_path {
        Some(path) => loader::load_layered_toml(&[path])?,
        None => loader::load_layered_toml_from_strings(&[""])?,
    };

    let mut config: AppConfig = serde_json::from_value(loaded.config_json.clone())?;

    if let Some(paper_trading) = env_bool("PAPER_TRADING") {
        config.runtime.mode = if paper_trading {
            RunMode::Paper
        } else {
            RunMode::Live
        };
    }
    if let Some(sandbox) = env_bool("ZERODHA_SANDBOX_MODE") {
        config.broker.sandbox_mode = sandbox;
    }

    let report = report_unused_keys(config.runtime.mode, &loaded.config_json, unused_key_policy)?;
    if !report.is_clean() {
        tracing::warn!(unused = ?report.unused_leaf_pointers, "config has unused keys");
    }

    let secrets = resolve_secrets_for_mode(&loaded.config_json, config.runtime.mode.as_secrets_mode())?;

    Ok(LoadResult {
        config,
        secrets,
        loaded,
    })
}

fn env_bool(name: &str) -> Option<bool> {
    let v = std::env::var(name).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_with_no_file_defaults_to_backtest_friendly_config() {
        // BACKTEST needs no broker secrets, so this exercises the bare
        // defaults path without touching the environment.
        let loaded = loader::load_layered_toml_from_strings(&["[runtime]\nmode = \"backtest\""])
            .unwrap();
        let config: AppConfig = serde_json::from_value(loaded.config_json.clone()).unwrap();
        assert_eq!(config.runtime.mode, RunMode::Backtest);
        assert_eq!(config.risk.max_daily_loss_pct, 0.02);
        assert_eq!(config.allocator.min_trade_interval_secs, 300);
        assert_eq!(config.broker.keys_env.api_key, "ZERODHA_API_KEY");
    }

    #[test]
    fn load_reads_a_toml_file_from_disk() {
        let path = write_temp_toml(
            "load_reads_a_toml_file_from_disk",
            b"[runtime]\nmode = \"backtest\"\n[risk]\nmax_drawdown_pct = 0.10\n",
        );

        let result = load(Some(&path), UnusedKeyPolicy::Warn).unwrap();
        assert_eq!(result.config.runtime.mode, RunMode::Backtest);
        assert_eq!(result.config.risk.max_drawdown_pct, 0.10);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn fail_policy_propagates_through_load() {
        let path = write_temp_toml(
            "fail_policy_propagates_through_load",
            b"[runtime]\nmode = \"backtest\"\n[typo_section]\nfoo = 1\n",
        );

        let result = load(Some(&path), UnusedKeyPolicy::Fail);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("CONFIG_UNUSED_KEYS"));

        std::fs::remove_file(&path).unwrap();
    }

    fn write_temp_toml(test_name: &str, bytes: &[u8]) -> String {
        let path = std::env::temp_dir().join(format!(
            "qte-config-test-{}-{}.toml",
            std::process::id(),
            test_name
        ));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path.to_str().unwrap().to_string()
    }
}
