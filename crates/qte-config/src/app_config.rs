//! Typed configuration deserialized from the canonical, merged JSON tree
//! [`crate::loader::LoadedConfig`] produces.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Live,
    Paper,
    Backtest,
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Paper
    }
}

impl RunMode {
    /// The string [`crate::secrets::resolve_secrets_for_mode`] expects.
    pub fn as_secrets_mode(&self) -> &'static str {
        match self {
            RunMode::Live => "LIVE",
            RunMode::Paper => "PAPER",
            RunMode::Backtest => "BACKTEST",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub mode: RunMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
        }
    }
}

/// Mirrors [`qte_allocator::TradeAllocator::new`]'s constructor arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    pub min_trade_interval_secs: i64,
    pub max_position_size_pct: f64,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            min_trade_interval_secs: 300,
            max_position_size_pct: 0.10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub post_exit_cooldown_secs: i64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            post_exit_cooldown_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourcePolicyConfig {
    pub capital_refresh_interval_secs: u64,
    pub historical_refresh_interval_secs: u64,
    pub quote_batch_size: usize,
}

impl Default for ResourcePolicyConfig {
    fn default() -> Self {
        Self {
            capital_refresh_interval_secs: 60,
            historical_refresh_interval_secs: 300,
            quote_batch_size: 500,
        }
    }
}

/// Env var *names* the secrets resolver reads — never the values themselves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerKeysEnv {
    pub api_key: String,
    pub api_secret: String,
    pub user_id: String,
}

impl Default for BrokerKeysEnv {
    fn default() -> Self {
        Self {
            api_key: "ZERODHA_API_KEY".to_string(),
            api_secret: "ZERODHA_API_SECRET".to_string(),
            user_id: "ZERODHA_USER_ID".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Overridden from `ZERODHA_SANDBOX_MODE` after the file/defaults layer
    /// is deserialized — env always wins for this flag.
    pub sandbox_mode: bool,
    pub keys_env: BrokerKeysEnv,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub risk: qte_risk::RiskLimits,
    pub allocator: AllocatorConfig,
    pub dedup: DedupConfig,
    pub resource_policy: ResourcePolicyConfig,
    pub broker: BrokerConfig,
}
