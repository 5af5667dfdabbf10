//! Two independent time gates guard order flow: the order manager's
//! new-entry cutoff (15:00, exits still allowed) and the risk manager's
//! trading-hours window (9:15-15:30). A non-exit order placed after the
//! cutoff but still inside trading hours is rejected by the cutoff gate
//! alone — the hours gate would have passed it.
use chrono::{TimeZone, Utc};
use qte_broker_paper::PaperBroker;
use qte_execution::OrderManager;
use qte_risk::{RiskLimits, RiskManager};
use qte_schemas::{Action, Order};
use std::sync::Arc;

fn order_at(is_exit: bool) -> Order {
    let mut order = Order::new("user-1", "RELIANCE", Action::Sell, 50, "momentum_breakout");
    if is_exit {
        order.exit_reason = Some("stop-loss hit".to_string());
    }
    order
}

#[test]
fn order_manager_rejects_non_exit_orders_after_the_new_entry_cutoff() {
    let broker = Arc::new(PaperBroker::new());
    let manager = OrderManager::new(broker);
    let seven_past_three = Utc.with_ymd_and_hms(2026, 7, 27, 15, 7, 0).unwrap();

    assert!(
        !manager.validate_order("user-1", &order_at(false), seven_past_three),
        "a non-exit order after 15:00 must be rejected by the cutoff gate"
    );
    assert!(
        manager.validate_order("user-1", &order_at(true), seven_past_three),
        "an exit-tagged order must still be allowed after the cutoff"
    );
}

#[test]
fn trading_hours_gate_alone_would_have_allowed_the_same_order() {
    let risk = RiskManager::new(1_000_000.0, RiskLimits::default());
    let seven_past_three = Utc.with_ymd_and_hms(2026, 7, 27, 15, 7, 0).unwrap();

    assert!(
        risk.validate_trading_hours(seven_past_three),
        "15:07 is still within the 9:15-15:30 trading session"
    );
}
