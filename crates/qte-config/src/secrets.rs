//! The single source of truth for runtime secret resolution.
//!
//! Config files store only env var **NAMES** (e.g. `"ZERODHA_API_KEY"`).
//! Callers invoke [`resolve_secrets_for_mode`] once at startup and pass the
//! returned [`ResolvedSecrets`] into constructors — never scatter
//! `std::env::var` calls across the codebase. `Debug` redacts every value;
//! error messages name the env var, never its value.
//!
//! | Mode      | Required                                               |
//! |-----------|---------------------------------------------------------|
//! | LIVE      | broker api_key, api_secret, user_id                      |
//! | PAPER     | broker api_key, api_secret                               |
//! | BACKTEST  | nothing                                                  |
//!
//! `REDIS_URL` and `DATABASE_URL` are always optional in every mode — the
//! shared store and persistence layers fall back to in-memory/no-op when
//! absent.

use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub broker_api_key: Option<String>,
    pub broker_api_secret: Option<String>,
    pub broker_user_id: Option<String>,
    pub redis_url: Option<String>,
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<REDACTED>");
        f.debug_struct("ResolvedSecrets")
            .field("broker_api_key", &redact(&self.broker_api_key))
            .field("broker_api_secret", &redact(&self.broker_api_secret))
            .field("broker_user_id", &redact(&self.broker_user_id))
            .field("redis_url", &redact(&self.redis_url))
            .field("database_url", &redact(&self.database_url))
            .finish()
    }
}

struct SecretEnvNames {
    api_key_var: String,
    api_secret_var: String,
    user_id_var: String,
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a named environment variable. `None` if unset or blank. Never
/// surfaced in an error path — callers report the NAME only.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_env_names(config_json: &Value) -> SecretEnvNames {
    SecretEnvNames {
        api_key_var: read_str_at(config_json, "/broker/keys_env/api_key")
            .unwrap_or_else(|| "ZERODHA_API_KEY".to_string()),
        api_secret_var: read_str_at(config_json, "/broker/keys_env/api_secret")
            .unwrap_or_else(|| "ZERODHA_API_SECRET".to_string()),
        user_id_var: read_str_at(config_json, "/broker/keys_env/user_id")
            .unwrap_or_else(|| "ZERODHA_USER_ID".to_string()),
    }
}

/// Resolve all secrets from the environment for `mode` (`"LIVE"` | `"PAPER"`
/// | `"BACKTEST"`, case-insensitive).
///
/// On a missing required variable, returns `Err` naming that variable —
/// never its value.
pub fn resolve_secrets_for_mode(config_json: &Value, mode: &str) -> Result<ResolvedSecrets> {
    let names = parse_env_names(config_json);
    let mode_upper = mode.trim().to_ascii_uppercase();

    let broker_api_key = resolve_env(&names.api_key_var);
    let broker_api_secret = resolve_env(&names.api_secret_var);
    let broker_user_id = resolve_env(&names.user_id_var);

    match mode_upper.as_str() {
        "LIVE" => {
            if broker_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (broker api_key) is not set or empty",
                    names.api_key_var,
                );
            }
            if broker_api_secret.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (broker api_secret) is not set or empty",
                    names.api_secret_var,
                );
            }
            if broker_user_id.is_none() {
                bail!(
                    "SECRETS_MISSING mode=LIVE: required env var '{}' (broker user id) is not set or empty",
                    names.user_id_var,
                );
            }
        }
        "PAPER" => {
            if broker_api_key.is_none() {
                bail!(
                    "SECRETS_MISSING mode=PAPER: required env var '{}' (broker api_key) is not set or empty",
                    names.api_key_var,
                );
            }
            if broker_api_secret.is_none() {
                bail!(
                    "SECRETS_MISSING mode=PAPER: required env var '{}' (broker api_secret) is not set or empty",
                    names.api_secret_var,
                );
            }
        }
        "BACKTEST" => {
            // No required secrets — provider/broker keys are optional.
        }
        other => {
            bail!(
                "SECRETS_UNKNOWN_MODE: unrecognised mode '{}'; expected one of: LIVE | PAPER | BACKTEST",
                other,
            );
        }
    }

    Ok(ResolvedSecrets {
        broker_api_key,
        broker_api_secret,
        broker_user_id,
        redis_url: resolve_env("REDIS_URL"),
        database_url: resolve_env("DATABASE_URL"),
    })
}
