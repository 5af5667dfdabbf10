use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitKind {
    TimeBased,
    StopLoss,
    Target,
    TrailingStop,
    ScalpTimeout,
    RiskBased,
    Manual,
}

/// Priority 0 is emergency/market-close, 1 mandatory close, 2 SL/trailing/
/// scalp, 3 target. Lower value sorts first —
/// `ExitPriority` derives `Ord` so a `Vec<ExitCondition>` can be
/// `sort_by_key(|e| e.priority)` directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ExitPriority {
    Emergency = 0,
    Mandatory = 1,
    StopOrTrailOrScalp = 2,
    Target = 3,
}

/// An ephemeral exit signal raised by the position monitor for one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExitCondition {
    pub symbol: String,
    pub kind: ExitKind,
    pub priority: ExitPriority,
    pub trigger_price: Option<Decimal>,
    pub trigger_time: Option<DateTime<Utc>>,
    pub reason: String,
}

impl ExitCondition {
    pub fn new(
        symbol: impl Into<String>,
        kind: ExitKind,
        priority: ExitPriority,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            priority,
            trigger_price: None,
            trigger_time: None,
            reason: reason.into(),
        }
    }

    pub fn with_trigger_price(mut self, price: Decimal) -> Self {
        self.trigger_price = Some(price);
        self
    }
}
