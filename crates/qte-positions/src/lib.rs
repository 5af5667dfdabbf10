//! qte-positions — the authoritative open-position book.
//!
//! `PositionTracker` is a plain in-memory map, not `Sync`: the daemon wraps
//! one instance in a lock and funnels every mutation (open, close, price
//! update) through it single-writer, matching the causal order
//! place_order → broker_ack → position update → dedup update. The tracker
//! itself stays free of locking so it's trivially unit-testable.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use qte_schemas::{Position, Side};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    AlreadyOpen(String),
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionError::AlreadyOpen(symbol) => {
                write!(f, "a position on {symbol} is already open")
            }
        }
    }
}

impl std::error::Error for PositionError {}

/// A realized close event, returned by [`PositionTracker::close`] so callers
/// (dedup cooldown, audit trail, allocator feedback) don't have to re-derive
/// it from the removed `Position`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedPosition {
    pub position: Position,
    pub exit_price: Decimal,
    pub realized_pnl: Decimal,
    pub exited_at: DateTime<Utc>,
}

/// One open position per symbol. At most one `Position` per symbol is ever
/// stored; opening a second before the first closes is rejected rather than
/// overwriting it silently.
#[derive(Default)]
pub struct PositionTracker {
    positions: HashMap<String, Position>,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, position: Position) -> Result<(), PositionError> {
        if self.positions.contains_key(&position.symbol) {
            return Err(PositionError::AlreadyOpen(position.symbol));
        }
        tracing::info!(symbol = %position.symbol, strategy = %position.strategy, "position opened");
        self.positions.insert(position.symbol.clone(), position);
        Ok(())
    }

    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn get_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol)
    }

    pub fn update_price(&mut self, symbol: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.update_price(price);
        }
    }

    /// Books a partial exit: reduces quantity, realizes the pnl on the
    /// exited portion, leaves the rest of the position open. No-op if the
    /// symbol isn't held or the partial quantity is >= the held quantity
    /// (use [`PositionTracker::close`] for a full exit instead).
    pub fn book_partial(&mut self, symbol: &str, exit_quantity: u64, exit_price: Decimal) -> Option<Decimal> {
        let position = self.positions.get_mut(symbol)?;
        if exit_quantity == 0 || exit_quantity >= position.quantity {
            return None;
        }
        let diff = match position.side {
            Side::Long => exit_price - position.average_price,
            Side::Short => position.average_price - exit_price,
        };
        let realized = diff * Decimal::from(exit_quantity);
        position.quantity -= exit_quantity;
        position.realized_pnl += realized;
        position.partial_profit_booked = true;
        position.recompute_pnl();
        Some(realized)
    }

    /// Removes and closes a position. Idempotent: closing a symbol that
    /// isn't open returns `None` rather than an error, since "already
    /// closed" is a benign race with the monitor loop, not a bug.
    pub fn close(&mut self, symbol: &str, exit_price: Decimal, exited_at: DateTime<Utc>) -> Option<ClosedPosition> {
        let mut position = self.positions.remove(symbol)?;
        let diff = match position.side {
            Side::Long => exit_price - position.average_price,
            Side::Short => position.average_price - exit_price,
        };
        let realized_pnl = position.realized_pnl + diff * Decimal::from(position.quantity);
        position.current_price = exit_price;
        position.realized_pnl = realized_pnl;
        tracing::info!(symbol = %symbol, realized_pnl = %realized_pnl, "position closed");
        Some(ClosedPosition {
            position,
            exit_price,
            realized_pnl,
            exited_at,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }

    pub fn all(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.unrealized_pnl).sum()
    }

    pub fn total_realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }
}
