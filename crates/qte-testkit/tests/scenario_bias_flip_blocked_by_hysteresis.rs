//! A bias that just flipped stays put against a second, weaker flip
//! attempt inside the hysteresis window, and decays instead of holding
//! steady.
use chrono::Duration;
use qte_bias::{BiasConfig, BiasEngine};
use qte_schemas::{BiasDirection, Regime, TimePhase};
use qte_testkit::internals_with;

#[test]
fn bullish_flip_survives_a_weaker_bearish_attempt_two_minutes_later() {
    let t0 = chrono::Utc::now();
    let mut engine = BiasEngine::new(BiasConfig::default(), t0);

    // First tick, six minutes after construction (past the five-minute
    // hysteresis window measured from engine start): strongly bullish
    // internals flip the engine from its initial neutral state.
    let bullish = internals_with(70.0, 20.0, Regime::Normal, TimePhase::Morning);
    let first = engine.update(&bullish, 0.0, t0 + Duration::minutes(6));
    assert_eq!(first.direction, BiasDirection::Bullish);
    assert!((first.confidence - 5.0).abs() < 0.01, "got {}", first.confidence);

    // Two minutes later: bearish internals would, on their own, produce a
    // BEARISH@6.0 candidate. Margin (6.0 - 5.0 = 1.0) and elapsed time
    // (2min < 5min) both fail, so the flip is blocked and the bullish
    // confidence decays by the hysteresis penalty instead.
    let bearish = internals_with(10.0, 70.0, Regime::Normal, TimePhase::Morning);
    let second = engine.update(&bearish, 0.0, t0 + Duration::minutes(8));
    assert_eq!(second.direction, BiasDirection::Bullish, "hysteresis must block the flip");
    assert!((second.confidence - 4.75).abs() < 0.01, "got {}", second.confidence);
}
