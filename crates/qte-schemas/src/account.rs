use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A user's brokerage account as tracked by the control plane.
///
/// Created on first successful broker authentication; `capital`
/// is refreshed from the broker at market open and after each realized P&L
/// event — the daemon/allocator orchestrate that refresh, this type is pure
/// data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub capital: Decimal,
    pub available_margin: Decimal,
    pub last_trade_at: Option<DateTime<Utc>>,
    pub performance_weight: f64,
    pub is_master: bool,
    pub enabled: bool,
}

impl UserAccount {
    pub fn new(user_id: impl Into<String>, capital: Decimal, available_margin: Decimal) -> Self {
        Self {
            user_id: user_id.into(),
            capital,
            available_margin,
            last_trade_at: None,
            performance_weight: 1.0,
            is_master: false,
            enabled: true,
        }
    }

    pub fn is_eligible(&self, now: DateTime<Utc>, min_trade_interval_secs: i64) -> bool {
        if !self.enabled || self.capital <= Decimal::ZERO {
            return false;
        }
        match self.last_trade_at {
            Some(t) => (now - t).num_seconds() >= min_trade_interval_secs,
            None => true,
        }
    }
}
