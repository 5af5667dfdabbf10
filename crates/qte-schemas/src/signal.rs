use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    /// The action that closes a position opened with this action.
    pub fn opposite(self) -> Action {
        match self {
            Action::Buy => Action::Sell,
            Action::Sell => Action::Buy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HybridMode {
    Scalp,
    Swing,
}

/// A candidate trade idea emitted by a strategy.
///
/// `confidence` is always stored normalized to `[0, 10]`. Callers building a
/// `Signal` from a strategy that scores on `[0, 1]` should run the raw value
/// through [`Signal::normalize_confidence`] first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: Uuid,
    pub strategy_name: String,
    pub symbol: String,
    pub action: Action,
    pub quantity: u64,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
    pub hybrid_mode: Option<HybridMode>,
    pub max_hold_minutes: Option<i64>,
}

impl Signal {
    /// Builds a signal with a fresh id and empty metadata, normalizing
    /// `raw_confidence` via [`Signal::normalize_confidence`].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        strategy_name: impl Into<String>,
        symbol: impl Into<String>,
        action: Action,
        quantity: u64,
        entry_price: Decimal,
        stop_loss: Decimal,
        target: Decimal,
        raw_confidence: f64,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy_name: strategy_name.into(),
            symbol: symbol.into(),
            action,
            quantity,
            entry_price,
            stop_loss,
            target,
            confidence: Self::normalize_confidence(raw_confidence),
            generated_at,
            metadata: BTreeMap::new(),
            hybrid_mode: None,
            max_hold_minutes: None,
        }
    }

    /// Normalizes `confidence` from a `[0,1]` or `[0,10]` scale to `[0,10]`.
    ///
    /// A value already `> 1.0` is assumed to be on the `[0,10]` scale
    /// already, so e.g. 0.85 and 8.5 normalize to the same value.
    pub fn normalize_confidence(raw: f64) -> f64 {
        if raw <= 1.0 {
            (raw * 10.0).min(10.0)
        } else {
            raw.min(10.0)
        }
    }

    pub fn is_exit_tagged(&self) -> bool {
        self.metadata
            .get("is_exit")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
