//! qte-testkit — shared fixtures for the controller-level scenario tests
//! under each crate's `tests/scenario_*.rs`.
//!
//! Nothing here is a production dependency of any other crate; it exists so
//! the same stub `QuoteSource`/`BrokerPositionSource`/`ExitExecutor` and the
//! same position/quote builders don't get re-typed in every scenario file.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qte_monitor::{BrokerPositionSource, ExitExecutor, QuoteSource};
use qte_schemas::{Action, CompositeScores, MarketInternals, Position, Quote, Regime, Side, TimePhase};
use rust_decimal::Decimal;

/// Builds a long position the way the production strategies do: explicit
/// stop-loss and target, entry price as `average_price`.
#[allow(clippy::too_many_arguments)]
pub fn long_position(
    symbol: &str,
    quantity: u64,
    average_price: i64,
    stop_loss: i64,
    target: i64,
    entry_time: DateTime<Utc>,
    strategy: &str,
) -> Position {
    Position::new(
        symbol,
        Side::Long,
        quantity,
        Decimal::from(average_price),
        Decimal::from(stop_loss),
        Decimal::from(target),
        entry_time,
        strategy,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn short_position(
    symbol: &str,
    quantity: u64,
    average_price: i64,
    stop_loss: i64,
    target: i64,
    entry_time: DateTime<Utc>,
    strategy: &str,
) -> Position {
    Position::new(
        symbol,
        Side::Short,
        quantity,
        Decimal::from(average_price),
        Decimal::from(stop_loss),
        Decimal::from(target),
        entry_time,
        strategy,
    )
}

/// A flat quote at `ltp` with every other field set to the same value;
/// good enough for anything that only reads `ltp`.
pub fn quote(symbol: &str, ltp: i64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        ltp: Decimal::from(ltp),
        open: Decimal::from(ltp),
        high: Decimal::from(ltp),
        low: Decimal::from(ltp),
        prev_close: Decimal::from(ltp),
        volume: 0,
        vwap: Decimal::from(ltp),
        change_percent: None,
        timestamp: Utc::now(),
    }
}

/// `MarketInternals` with every field that matters pinned explicitly —
/// deliberately does not lean on `MarketInternals::default()` alone, whose
/// `TimePhase::Other` zeroes out bias confidence via its multiplier.
pub fn internals_with(bullish: f64, bearish: f64, regime: Regime, phase: TimePhase) -> MarketInternals {
    MarketInternals {
        scores: CompositeScores {
            bullish,
            bearish,
            neutral: 100.0 - bullish - bearish,
        },
        regime,
        time_phase: phase,
        ..MarketInternals::default()
    }
}

/// Fixed quote book, keyed by symbol.
pub struct FixedQuotes(pub BTreeMap<String, Quote>);

#[async_trait]
impl QuoteSource for FixedQuotes {
    async fn quotes(&self, _symbols: &[String]) -> BTreeMap<String, Quote> {
        self.0.clone()
    }
}

/// Reports the same broker-side quantity for every symbol asked about.
pub struct FixedBrokerQuantity(pub u64);

#[async_trait]
impl BrokerPositionSource for FixedBrokerQuantity {
    async fn broker_quantity(&self, _symbol: &str) -> u64 {
        self.0
    }
}

/// Records every exit submission; never fails.
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Mutex<Vec<(String, Action, u64)>>,
}

#[async_trait]
impl ExitExecutor for RecordingExecutor {
    async fn submit_exit(&self, symbol: &str, action: Action, quantity: u64) -> Result<(), String> {
        self.calls.lock().unwrap().push((symbol.to_string(), action, quantity));
        Ok(())
    }
}
