//! Position Monitor — the periodic loop that evaluates and executes exits
//! across the whole open-position book.
//!
//! [`PositionMonitor::tick`] runs one iteration of the algorithm: refresh
//! prices, evaluate every position's exit conditions, sort the collected
//! conditions by priority, and execute them in that order. Broker I/O is
//! reached only through the [`QuoteSource`], [`BrokerPositionSource`] and
//! [`ExitExecutor`] seams, so the loop itself is broker-agnostic and
//! testable with stubs.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use qte_positions::{ClosedPosition, PositionTracker};
use qte_schemas::symbol::is_option;
use qte_schemas::{event_kinds, Action, ControlEvent, EventSeverity, ExitPriority, Quote, Side};
use tracing::{info, warn};

use crate::evaluator::{evaluate_exit, ExitAction, ExitContext};

const MARKET_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
const MARKET_CLOSE_SCAN: NaiveTime = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
const ACTIVE_CADENCE_SECS: u64 = 5;
const IDLE_CADENCE_SECS: u64 = 30;

/// How long to sleep before the next tick, given the current wall time.
pub fn tick_interval_secs(now: DateTime<Utc>) -> u64 {
    let t = now.time();
    if t >= MARKET_OPEN && t < MARKET_CLOSE_SCAN {
        ACTIVE_CADENCE_SECS
    } else {
        IDLE_CADENCE_SECS
    }
}

/// Batched quote lookup. A production implementation routes equities
/// through the feed's quote cache and options through a direct broker call,
/// since the feed does not carry option prices; this seam hides that split
/// from the monitor loop.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quotes(&self, symbols: &[String]) -> BTreeMap<String, Quote>;
}

/// Broker-side quantity for a symbol, used to sanity-cap exit quantities
/// against what the broker actually holds before submitting an exit.
#[async_trait]
pub trait BrokerPositionSource: Send + Sync {
    async fn broker_quantity(&self, symbol: &str) -> u64;
}

/// Submits a market exit order. `Err` is treated as "Order Manager
/// unavailable" and falls back to closing the position directly in the
/// tracker, per the monitor's execution contract.
#[async_trait]
pub trait ExitExecutor: Send + Sync {
    async fn submit_exit(&self, symbol: &str, action: Action, quantity: u64) -> Result<(), String>;
}

pub struct TickInputs<'a> {
    pub now: DateTime<Utc>,
    pub risk_emergency_stop: bool,
    pub daily_loss_breached: bool,
    pub quotes: &'a dyn QuoteSource,
    pub broker_positions: &'a dyn BrokerPositionSource,
    pub executor: &'a dyn ExitExecutor,
}

#[derive(Default)]
pub struct TickReport {
    pub closed: Vec<ClosedPosition>,
    pub partial_books: Vec<(String, u64)>,
    pub events: Vec<ControlEvent>,
}

/// Per-session exit bookkeeping layered on top of a [`PositionTracker`].
/// The tracker itself has no notion of "already exited this session" —
/// that's the monitor's concern, since it governs whether the monitor
/// re-submits an exit, not whether a position exists.
#[derive(Default)]
pub struct PositionMonitor {
    terminal_exits_this_session: HashSet<String>,
}

impl PositionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tick(&mut self, tracker: &mut PositionTracker, inputs: TickInputs<'_>) -> TickReport {
        let symbols: Vec<String> = tracker.symbols().map(str::to_string).collect();
        let quotes = inputs.quotes.quotes(&symbols).await;

        let mut pending: Vec<(String, ExitAction)> = Vec::new();

        for symbol in &symbols {
            if let Some(quote) = quotes.get(symbol) {
                tracker.update_price(symbol, quote.ltp);
            }
            let Some(position) = tracker.get_mut(symbol) else {
                continue;
            };
            let ctx = ExitContext {
                now: inputs.now,
                is_option: is_option(symbol),
                risk_emergency_stop: inputs.risk_emergency_stop,
                daily_loss_breached: inputs.daily_loss_breached,
            };
            if let Some(action) = evaluate_exit(position, &ctx) {
                pending.push((symbol.clone(), action));
            }
        }

        pending.sort_by_key(|(_, action)| action.condition().priority);

        let mut report = TickReport::default();

        for (symbol, action) in pending {
            if self.terminal_exits_this_session.contains(&symbol) {
                continue;
            }
            self.execute(tracker, &inputs, symbol, action, &mut report).await;
        }

        report
    }

    async fn execute(
        &mut self,
        tracker: &mut PositionTracker,
        inputs: &TickInputs<'_>,
        symbol: String,
        action: ExitAction,
        report: &mut TickReport,
    ) {
        let Some(position) = tracker.get(&symbol) else {
            return;
        };
        let closing_side = match position.side {
            Side::Long => Action::Sell,
            Side::Short => Action::Buy,
        };
        let current_price = position.current_price;
        let position_qty = position.quantity;
        let option = is_option(&symbol);

        let (requested_qty, is_partial, condition) = match action {
            ExitAction::Full(condition) => (position_qty, false, condition),
            ExitAction::Partial { condition, quantity } if !option => (quantity, true, condition),
            // Lot-size constraint: options never partial-exit even if the
            // evaluator (position-only context) produced a partial action.
            ExitAction::Partial { condition, .. } => (position_qty, false, condition),
        };

        let actual_qty = inputs.broker_positions.broker_quantity(&symbol).await;
        let exit_qty = requested_qty.min(actual_qty);
        if actual_qty == 0 {
            warn!(symbol = %symbol, "broker reports zero quantity, cancelling exit");
            return;
        }

        if condition.priority == ExitPriority::Emergency {
            report.events.push(ControlEvent::new(
                event_kinds::POSITION_CLOSED,
                EventSeverity::Critical,
                "position_monitor",
                "market close emergency exit",
                format!("{symbol} still open at market-close cutoff, forcing exit"),
                inputs.now,
            ));
        }

        let submission = inputs.executor.submit_exit(&symbol, closing_side, exit_qty).await;
        if let Err(err) = submission {
            warn!(symbol = %symbol, %err, "order manager unavailable, closing directly in tracker");
        }

        let exit_price = condition.trigger_price.unwrap_or(current_price);
        if is_partial {
            if let Some(realized) = tracker.book_partial(&symbol, exit_qty, exit_price) {
                info!(symbol = %symbol, %realized, "partial exit booked");
                report.partial_books.push((symbol, exit_qty));
            }
        } else if let Some(closed) = tracker.close(&symbol, exit_price, inputs.now) {
            self.terminal_exits_this_session.insert(symbol.clone());
            info!(symbol = %symbol, realized_pnl = %closed.realized_pnl, reason = %condition.reason, "position closed by monitor");
            report.closed.push(closed);
        }
    }

    pub fn reset_session(&mut self) {
        self.terminal_exits_this_session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use qte_schemas::Position;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct StubQuotes(BTreeMap<String, Quote>);

    #[async_trait]
    impl QuoteSource for StubQuotes {
        async fn quotes(&self, _symbols: &[String]) -> BTreeMap<String, Quote> {
            self.0.clone()
        }
    }

    struct StubBrokerPositions(u64);

    #[async_trait]
    impl BrokerPositionSource for StubBrokerPositions {
        async fn broker_quantity(&self, _symbol: &str) -> u64 {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(String, Action, u64)>>,
        fail: bool,
    }

    #[async_trait]
    impl ExitExecutor for RecordingExecutor {
        async fn submit_exit(&self, symbol: &str, action: Action, quantity: u64) -> Result<(), String> {
            self.calls.lock().unwrap().push((symbol.to_string(), action, quantity));
            if self.fail {
                return Err("unavailable".to_string());
            }
            Ok(())
        }
    }

    fn quote(symbol: &str, ltp: i64) -> Quote {
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

    fn long_position(symbol: &str) -> Position {
        Position::new(
            symbol,
            Side::Long,
            100,
            Decimal::from(100),
            Decimal::from(95),
            Decimal::from(110),
            Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap(),
            "momentum_breakout",
        )
    }

    #[tokio::test]
    async fn stop_loss_breach_closes_position_through_executor() {
        let mut tracker = PositionTracker::new();
        tracker.open(long_position("RELIANCE")).unwrap();

        let mut monitor = PositionMonitor::new();
        let quotes = StubQuotes(BTreeMap::from([("RELIANCE".to_string(), quote("RELIANCE", 94))]));
        let broker_positions = StubBrokerPositions(100);
        let executor = RecordingExecutor::default();

        let report = monitor
            .tick(
                &mut tracker,
                TickInputs {
                    now: Utc.with_ymd_and_hms(2026, 7, 27, 11, 0, 0).unwrap(),
                    risk_emergency_stop: false,
                    daily_loss_breached: false,
                    quotes: &quotes,
                    broker_positions: &broker_positions,
                    executor: &executor,
                },
            )
            .await;

        assert_eq!(report.closed.len(), 1);
        assert!(!tracker.has_open_position("RELIANCE"));
        assert_eq!(executor.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_broker_quantity_cancels_the_exit() {
        let mut tracker = PositionTracker::new();
        tracker.open(long_position("RELIANCE")).unwrap();

        let mut monitor = PositionMonitor::new();
        let quotes = StubQuotes(BTreeMap::from([("RELIANCE".to_string(), quote("RELIANCE", 94))]));
        let broker_positions = StubBrokerPositions(0);
        let executor = RecordingExecutor::default();

        let report = monitor
            .tick(
                &mut tracker,
                TickInputs {
                    now: Utc.with_ymd_and_hms(2026, 7, 27, 11, 0, 0).unwrap(),
                    risk_emergency_stop: false,
                    daily_loss_breached: false,
                    quotes: &quotes,
                    broker_positions: &broker_positions,
                    executor: &executor,
                },
            )
            .await;

        assert!(report.closed.is_empty());
        assert!(tracker.has_open_position("RELIANCE"));
        assert!(executor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn executor_failure_falls_back_to_direct_tracker_close() {
        let mut tracker = PositionTracker::new();
        tracker.open(long_position("RELIANCE")).unwrap();

        let mut monitor = PositionMonitor::new();
        let quotes = StubQuotes(BTreeMap::from([("RELIANCE".to_string(), quote("RELIANCE", 94))]));
        let broker_positions = StubBrokerPositions(100);
        let executor = RecordingExecutor { fail: true, ..Default::default() };

        let report = monitor
            .tick(
                &mut tracker,
                TickInputs {
                    now: Utc.with_ymd_and_hms(2026, 7, 27, 11, 0, 0).unwrap(),
                    risk_emergency_stop: false,
                    daily_loss_breached: false,
                    quotes: &quotes,
                    broker_positions: &broker_positions,
                    executor: &executor,
                },
            )
            .await;

        assert_eq!(report.closed.len(), 1);
        assert!(!tracker.has_open_position("RELIANCE"));
    }

    #[tokio::test]
    async fn already_terminal_symbol_is_skipped_on_next_tick() {
        let mut tracker = PositionTracker::new();
        tracker.open(long_position("RELIANCE")).unwrap();

        let mut monitor = PositionMonitor::new();
        let quotes = StubQuotes(BTreeMap::from([("RELIANCE".to_string(), quote("RELIANCE", 94))]));
        let broker_positions = StubBrokerPositions(100);
        let executor = RecordingExecutor::default();
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 11, 0, 0).unwrap();

        monitor
            .tick(
                &mut tracker,
                TickInputs {
                    now,
                    risk_emergency_stop: false,
                    daily_loss_breached: false,
                    quotes: &quotes,
                    broker_positions: &broker_positions,
                    executor: &executor,
                },
            )
            .await;

        tracker.open(long_position("RELIANCE")).unwrap();
        monitor
            .tick(
                &mut tracker,
                TickInputs {
                    now,
                    risk_emergency_stop: false,
                    daily_loss_breached: false,
                    quotes: &quotes,
                    broker_positions: &broker_positions,
                    executor: &executor,
                },
            )
            .await;

        assert!(tracker.has_open_position("RELIANCE"));
        assert_eq!(executor.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn cadence_is_five_seconds_during_market_hours() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap();
        assert_eq!(tick_interval_secs(now), 5);
    }

    #[test]
    fn cadence_is_thirty_seconds_outside_market_hours() {
        let now = Utc.with_ymd_and_hms(2026, 7, 27, 20, 0, 0).unwrap();
        assert_eq!(tick_interval_secs(now), 30);
    }
}
