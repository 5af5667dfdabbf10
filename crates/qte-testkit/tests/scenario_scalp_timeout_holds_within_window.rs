//! A scalp-tagged position sitting at a small loss past its max hold time
//! but short of double that time must not be force-exited yet — only a
//! profitable exit at `max_hold_minutes` or a forced loss exit at twice
//! that are recognized.
use chrono::{TimeZone, Utc};
use qte_monitor::evaluator::{evaluate_exit, ExitContext};
use qte_testkit::long_position;
use serde_json::json;

#[test]
fn scalp_position_sixteen_minutes_in_at_a_small_loss_is_held() {
    let entry_time = Utc.with_ymd_and_hms(2026, 7, 27, 10, 15, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 7, 27, 10, 31, 0).unwrap();
    let mut position = long_position("BANKNIFTY24JAN45000CE", 75, 100, 90, 110, entry_time, "scalp_breakout");
    position.metadata.insert("hybrid_mode".to_string(), json!("SCALP"));
    position.metadata.insert("max_hold_minutes".to_string(), json!(15));
    position.update_price(rust_decimal::Decimal::new(997, 1)); // 99.7, -0.3%

    let ctx = ExitContext {
        now,
        is_option: true,
        risk_emergency_stop: false,
        daily_loss_breached: false,
    };

    assert!(
        evaluate_exit(&mut position, &ctx).is_none(),
        "16 minutes held (< 2x max_hold_minutes) at a small loss must not force an exit"
    );
}
