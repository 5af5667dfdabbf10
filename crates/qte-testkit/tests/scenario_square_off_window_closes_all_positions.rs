//! Inside the 15:15 intraday square-off window, every open position closes
//! on the same tick — long, short, and option alike — ahead of any
//! individual stop-loss, target, or trailing-stop state.
use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use qte_monitor::{PositionMonitor, TickInputs};
use qte_positions::PositionTracker;
use qte_testkit::{long_position, quote, short_position, FixedBrokerQuantity, FixedQuotes, RecordingExecutor};

#[tokio::test]
async fn square_off_window_closes_long_short_and_option_positions_together() {
    let entry_time = Utc.with_ymd_and_hms(2026, 7, 27, 9, 30, 0).unwrap();
    let mut tracker = PositionTracker::new();
    tracker.open(long_position("RELIANCE", 50, 2_500, 2_400, 2_700, entry_time, "momentum_breakout")).unwrap();
    tracker.open(short_position("TCS", 20, 3_500, 3_600, 3_300, entry_time, "mean_reversion")).unwrap();
    tracker
        .open(long_position("NIFTY24DEC26000CE", 150, 120, 100, 500, entry_time, "gap_and_go"))
        .unwrap();

    let mut monitor = PositionMonitor::new();
    let quotes = FixedQuotes(BTreeMap::from([
        ("RELIANCE".to_string(), quote("RELIANCE", 2_550)),
        ("TCS".to_string(), quote("TCS", 3_480)),
        ("NIFTY24DEC26000CE".to_string(), quote("NIFTY24DEC26000CE", 150)),
    ]));
    let broker_positions = FixedBrokerQuantity(1_000);
    let executor = RecordingExecutor::default();

    let report = monitor
        .tick(
            &mut tracker,
            TickInputs {
                now: Utc.with_ymd_and_hms(2026, 7, 27, 15, 15, 2).unwrap(),
                risk_emergency_stop: false,
                daily_loss_breached: false,
                quotes: &quotes,
                broker_positions: &broker_positions,
                executor: &executor,
            },
        )
        .await;

    // time_based is the first check evaluate_exit runs, so all three close
    // on the square-off window alone, regardless of each position's own
    // stop-loss/target/trailing state.
    assert_eq!(report.closed.len(), 3, "all three positions must close in the square-off window");
    assert!(tracker.is_empty());
    assert_eq!(executor.calls.lock().unwrap().len(), 3);
}
