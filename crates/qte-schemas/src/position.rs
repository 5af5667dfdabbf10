use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn sign(self) -> i64 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }
}

/// An open position in the authoritative book.
///
/// Invariants (enforced by [`Position::new`] / [`Position::recompute_pnl`],
/// never by callers poking fields directly):
/// - `side = Long  => stop_loss < average_price < target`
/// - `side = Short => stop_loss > average_price > target`
/// - at most one open `Position` per symbol (enforced by the tracker, not here)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: Side,
    pub quantity: u64,
    pub average_price: Decimal,
    pub current_price: Decimal,
    pub stop_loss: Decimal,
    pub target: Decimal,
    pub trailing_stop: Option<Decimal>,
    pub entry_time: DateTime<Utc>,
    pub strategy: String,
    pub partial_profit_booked: bool,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub metadata: BTreeMap<String, Value>,
}

impl Position {
    /// Constructs a position, auto-correcting `side` if it disagrees with the
    /// relative ordering of `stop_loss` / `average_price` / `target`
    /// (auto-correct when unambiguous, per the state-inconsistency policy).
    ///
    /// "Unambiguous" means stop_loss and target fall strictly on opposite
    /// sides of average_price; if they don't (e.g. stop_loss == target, or
    /// both above/below average_price), the requested `side` is kept as-is
    /// since there is no side that would make the triple consistent.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        side: Side,
        quantity: u64,
        average_price: Decimal,
        stop_loss: Decimal,
        target: Decimal,
        entry_time: DateTime<Utc>,
        strategy: impl Into<String>,
    ) -> Self {
        let corrected_side = if stop_loss < average_price && average_price < target {
            Side::Long
        } else if stop_loss > average_price && average_price > target {
            Side::Short
        } else {
            side
        };

        Self {
            symbol: symbol.into(),
            side: corrected_side,
            quantity,
            average_price,
            current_price: average_price,
            stop_loss,
            target,
            trailing_stop: None,
            entry_time,
            strategy: strategy.into(),
            partial_profit_booked: false,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            metadata: BTreeMap::new(),
        }
    }

    /// Recomputes `unrealized_pnl` from `current_price` given `side`.
    pub fn recompute_pnl(&mut self) {
        let diff = match self.side {
            Side::Long => self.current_price - self.average_price,
            Side::Short => self.average_price - self.current_price,
        };
        self.unrealized_pnl = diff * Decimal::from(self.quantity);
    }

    pub fn update_price(&mut self, price: Decimal) {
        self.current_price = price;
        self.recompute_pnl();
    }

    /// Unrealized P&L percentage relative to cost basis (average_price × qty).
    pub fn pnl_pct(&self) -> Decimal {
        let cost = self.average_price * Decimal::from(self.quantity);
        if cost.is_zero() {
            Decimal::ZERO
        } else {
            self.unrealized_pnl / cost * Decimal::from(100)
        }
    }

    pub fn minutes_held(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_minutes()
    }
}
