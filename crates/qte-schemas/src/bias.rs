use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Normal,
    Trending,
    Choppy,
    VolatileTrending,
    VolatileChoppy,
    Quiet,
}

impl Regime {
    /// Confidence multiplier used by the bias engine.
    pub fn confidence_multiplier(self) -> f64 {
        match self {
            Regime::Trending => 1.2,
            Regime::Choppy => 0.5,
            Regime::VolatileChoppy => 0.3,
            Regime::Quiet => 0.4,
            Regime::Normal | Regime::VolatileTrending => 1.0,
        }
    }
}

/// The system's current inferred intraday market direction.
///
/// Flip hysteresis: `direction` may only change if
/// at least `min_bias_duration` has elapsed since `last_changed_at`, or the
/// new confidence beats the old by `>= 2.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketBias {
    pub direction: BiasDirection,
    pub confidence: f64,
    pub regime: Regime,
    pub stability: f64,
    pub last_changed_at: DateTime<Utc>,
}

impl MarketBias {
    pub fn neutral(now: DateTime<Utc>) -> Self {
        Self {
            direction: BiasDirection::Neutral,
            confidence: 0.0,
            regime: Regime::Normal,
            stability: 0.0,
            last_changed_at: now,
        }
    }

    /// Effective direction is Neutral both when truly neutral and when the
    /// confidence is too low to trust.
    fn effectively_neutral(&self) -> bool {
        matches!(self.direction, BiasDirection::Neutral) || self.confidence < 3.0
    }

    fn aligned(&self, action: super::Action) -> bool {
        matches!(
            (self.direction, action),
            (BiasDirection::Bullish, super::Action::Buy) | (BiasDirection::Bearish, super::Action::Sell)
        )
    }

    /// Whether a signal of the given action/confidence should be allowed
    /// through.
    pub fn should_allow_signal(&self, action: super::Action, signal_confidence: f64) -> bool {
        if signal_confidence >= 8.5 {
            return true;
        }
        if self.effectively_neutral() {
            return signal_confidence >= 6.5;
        }
        if self.aligned(action) {
            return signal_confidence >= 5.5;
        }
        // Counter-trend.
        signal_confidence >= (7.5 + self.confidence).min(9.9)
    }

    /// Position-size multiplier for the given action.
    pub fn position_size_multiplier(&self, action: super::Action) -> f64 {
        if self.effectively_neutral() {
            return 1.0;
        }
        if self.aligned(action) {
            1.0 + 0.5 * (self.confidence / 10.0)
        } else {
            0.7
        }
    }
}
