//! Mode-aware fail-closed enforcement of `resolve_secrets_for_mode`.
//!
//! All failure tests use globally-unique sentinel env var names
//! (`QTE_CFG_SENTINEL_*`) that are never set in CI or a dev shell, so the
//! tests need no `std::env::set_var` and can't race each other.

use qte_config::load_layered_toml_from_strings;
use qte_config::secrets::resolve_secrets_for_mode;

fn load(toml: &str) -> serde_json::Value {
    load_layered_toml_from_strings(&[toml])
        .expect("test toml must parse cleanly")
        .config_json
}

#[test]
fn live_mode_fails_when_broker_api_key_missing() {
    let toml = r#"
[broker.keys_env]
api_key = "QTE_CFG_SENTINEL_LIVE_APIKEY_A1"
api_secret = "QTE_CFG_SENTINEL_LIVE_APISEC_A1"
user_id = "QTE_CFG_SENTINEL_LIVE_USERID_A1"
"#;
    let cfg = load(toml);
    let err = resolve_secrets_for_mode(&cfg, "LIVE").unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"));
    assert!(err.contains("mode=LIVE"));
    assert!(err.contains("QTE_CFG_SENTINEL_LIVE_APIKEY_A1"));
}

#[test]
fn paper_mode_fails_when_broker_api_key_missing() {
    let toml = r#"
[broker.keys_env]
api_key = "QTE_CFG_SENTINEL_PAPER_APIKEY_B2"
api_secret = "QTE_CFG_SENTINEL_PAPER_APISEC_B2"
"#;
    let cfg = load(toml);
    let err = resolve_secrets_for_mode(&cfg, "PAPER").unwrap_err().to_string();
    assert!(err.contains("SECRETS_MISSING"));
    assert!(err.contains("mode=PAPER"));
}

#[test]
fn backtest_mode_succeeds_with_no_keys_set() {
    let toml = r#"
[broker.keys_env]
api_key = "QTE_CFG_SENTINEL_BT_APIKEY_D4"
api_secret = "QTE_CFG_SENTINEL_BT_APISEC_D4"
user_id = "QTE_CFG_SENTINEL_BT_USERID_D4"
"#;
    let cfg = load(toml);
    let secrets = resolve_secrets_for_mode(&cfg, "BACKTEST").expect("BACKTEST must not fail");
    assert!(secrets.broker_api_key.is_none());
    assert!(secrets.broker_api_secret.is_none());
    assert!(secrets.broker_user_id.is_none());
}

#[test]
fn unknown_mode_is_rejected() {
    let cfg = load("");
    let err = resolve_secrets_for_mode(&cfg, "SIMULATION").unwrap_err().to_string();
    assert!(err.contains("SECRETS_UNKNOWN_MODE"));
    assert!(err.contains("SIMULATION"));
}

#[test]
fn config_json_stores_var_names_not_resolved_values() {
    let toml = r#"
[broker.keys_env]
api_key = "ZERODHA_API_KEY_PAPER"
api_secret = "ZERODHA_API_SECRET_PAPER"
"#;
    let loaded = load_layered_toml_from_strings(&[toml]).unwrap();
    assert_eq!(
        loaded.config_json.pointer("/broker/keys_env/api_key").and_then(|v| v.as_str()),
        Some("ZERODHA_API_KEY_PAPER"),
    );
    assert!(!loaded.canonical_json.contains("sk-"));
}

#[test]
fn resolved_secrets_debug_output_is_redacted() {
    let toml = r#"
[broker.keys_env]
api_key = "QTE_CFG_SENTINEL_DBG_KEY_E5"
api_secret = "QTE_CFG_SENTINEL_DBG_SEC_E5"
"#;
    let cfg = load(toml);
    let secrets = resolve_secrets_for_mode(&cfg, "BACKTEST").expect("BACKTEST must not fail");
    let debug_str = format!("{secrets:?}");
    assert!(debug_str.contains("None") || debug_str.contains("REDACTED"));
    assert!(!debug_str.contains("sk-"));
}
