//! Options never partial-book on a target touch, regardless of quantity —
//! the lot-size constraint the evaluator can't see on its own (it only
//! knows quantities, not contract type) is enforced in `PositionMonitor`.
use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use qte_monitor::{PositionMonitor, TickInputs};
use qte_positions::PositionTracker;
use qte_testkit::{long_position, quote, FixedBrokerQuantity, FixedQuotes, RecordingExecutor};

#[tokio::test]
async fn option_at_target_closes_in_full_with_the_expected_realized_pnl() {
    let entry_time = Utc.with_ymd_and_hms(2026, 7, 27, 9, 30, 0).unwrap();
    let mut tracker = PositionTracker::new();
    tracker
        .open(long_position("NIFTY24DEC26000CE", 150, 120, 100, 180, entry_time, "gap_and_go"))
        .unwrap();

    let mut monitor = PositionMonitor::new();
    let quotes = FixedQuotes(BTreeMap::from([("NIFTY24DEC26000CE".to_string(), quote("NIFTY24DEC26000CE", 180))]));
    let broker_positions = FixedBrokerQuantity(150);
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
    assert!(report.partial_books.is_empty(), "an option must never partial-book a target touch");
    assert!(!tracker.has_open_position("NIFTY24DEC26000CE"));

    let closed = &report.closed[0];
    assert_eq!(closed.realized_pnl, rust_decimal::Decimal::from(9_000));
}
