//! qte-bias — Directional Bias Engine.
//!
//! Runs after the internals analyzer. Stateful across ticks (rolling NIFTY
//! momentum buffer, last-5 direction history for stability, hysteresis
//! clock) but exposes a single pure-ish [`BiasEngine::update`] entry point;
//! no IO.

use std::collections::VecDeque;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use qte_schemas::{BiasDirection, MarketBias, MarketInternals, Regime};

/// Confidence decay applied when hysteresis blocks a flip (see
/// BULLISH@5.0 blocked from flipping to BEARISH@6.0 decays to ≈4.75).
const BLOCKED_DECAY: f64 = 0.95;

const HISTORY_LEN: usize = 5;

pub struct BiasConfig {
    pub min_bias_duration: StdDuration,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            min_bias_duration: StdDuration::from_secs(5 * 60),
        }
    }
}

pub struct BiasEngine {
    config: BiasConfig,
    current: MarketBias,
    direction_history: VecDeque<BiasDirection>,
    nifty_change_buffer: VecDeque<f64>,
}

impl BiasEngine {
    pub fn new(config: BiasConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            current: MarketBias::neutral(now),
            direction_history: VecDeque::with_capacity(HISTORY_LEN),
            nifty_change_buffer: VecDeque::with_capacity(5),
        }
    }

    pub fn current(&self) -> MarketBias {
        self.current
    }

    /// Feeds one NIFTY change-percent sample (percent units, e.g. 0.3 for
    /// 0.3%) into the rolling momentum buffer used for the base-direction
    /// computation.
    pub fn push_nifty_change(&mut self, change_pct: f64) {
        if self.nifty_change_buffer.len() == 5 {
            self.nifty_change_buffer.pop_front();
        }
        self.nifty_change_buffer.push_back(change_pct);
    }

    /// Trend consistency: fraction of buffered samples sharing the sign of
    /// the mean, in `[0, 1]`. Used to weight the momentum mean.
    fn trend_consistency(&self, mean: f64) -> f64 {
        if self.nifty_change_buffer.is_empty() {
            return 0.0;
        }
        let sign = mean.signum();
        let matching = self
            .nifty_change_buffer
            .iter()
            .filter(|v| v.signum() == sign || v.abs() < f64::EPSILON)
            .count();
        matching as f64 / self.nifty_change_buffer.len() as f64
    }

    fn momentum_mean(&self) -> f64 {
        if self.nifty_change_buffer.is_empty() {
            0.0
        } else {
            self.nifty_change_buffer.iter().sum::<f64>() / self.nifty_change_buffer.len() as f64
        }
    }

    fn stability_for(&self, candidate: BiasDirection) -> f64 {
        if self.direction_history.is_empty() {
            return 1.0;
        }
        let matches = self
            .direction_history
            .iter()
            .filter(|d| **d == candidate)
            .count();
        let mut stability = matches as f64 / self.direction_history.len() as f64;

        let last_three_match = self.direction_history.len() >= 3
            && self
                .direction_history
                .iter()
                .rev()
                .take(3)
                .all(|d| *d == candidate);
        if last_three_match {
            stability += 0.2;
        }
        stability.min(1.0)
    }

    fn push_history(&mut self, direction: BiasDirection) {
        if self.direction_history.len() == HISTORY_LEN {
            self.direction_history.pop_front();
        }
        self.direction_history.push_back(direction);
    }

    /// Runs one bias-update tick.
    ///
    /// `gap_pct` is the opening gap (today's open vs prev close), signed,
    /// in percent units; only consulted during the OPENING time phase.
    pub fn update(&mut self, internals: &MarketInternals, gap_pct: f64, now: DateTime<Utc>) -> MarketBias {
        // --- Step 1: base direction from NIFTY momentum. ---
        let mean = self.momentum_mean();
        let consistency = self.trend_consistency(mean);
        let (base_direction, base_confidence) = if mean.abs() >= 0.1 {
            let dir = if mean > 0.0 {
                BiasDirection::Bullish
            } else {
                BiasDirection::Bearish
            };
            (dir, (mean.abs() * consistency * 10.0).min(10.0))
        } else {
            (BiasDirection::Neutral, 0.0)
        };

        // --- Step 2: internals direction. ---
        let diff = internals.scores.bullish - internals.scores.bearish;
        let (internals_direction, internals_confidence) = if diff >= 10.0 {
            (BiasDirection::Bullish, (diff / 10.0).min(10.0))
        } else if diff <= -10.0 {
            (BiasDirection::Bearish, (diff.abs() / 10.0).min(10.0))
        } else {
            (BiasDirection::Neutral, 0.0)
        };

        // --- Step 3: combine. ---
        let (mut direction, mut confidence) = combine(
            base_direction,
            base_confidence,
            internals_direction,
            internals_confidence,
        );

        // --- Step 4: opening-gap term. ---
        if matches!(internals.time_phase, qte_schemas::TimePhase::Opening) && gap_pct.abs() >= 0.5 {
            let cap = if matches!(internals.regime, Regime::Choppy | Regime::VolatileChoppy) {
                0.15
            } else {
                0.35
            };
            let gap_term = (gap_pct.abs() * cap).min(gap_pct.abs() * 0.35);
            let gap_direction = if gap_pct > 0.0 {
                BiasDirection::Bullish
            } else {
                BiasDirection::Bearish
            };
            if direction == BiasDirection::Neutral {
                direction = gap_direction;
                confidence = gap_term;
            } else if direction == gap_direction {
                confidence += gap_term;
            } else {
                confidence -= gap_term;
            }
        }

        // --- Step 5: regime + time-phase multipliers. ---
        confidence *= internals.regime.confidence_multiplier();
        confidence *= internals.time_phase.confidence_multiplier();
        confidence = confidence.max(0.0).min(10.0);

        // --- Step 6: low confidence collapses to neutral. ---
        if confidence < 3.0 {
            direction = BiasDirection::Neutral;
        }

        let stability = self.stability_for(direction);

        // --- Step 7: hysteresis. ---
        let elapsed = now.signed_duration_since(self.current.last_changed_at);
        let elapsed_ok = elapsed.to_std().unwrap_or_default() >= self.config.min_bias_duration;
        let confidence_override = confidence >= 7.0;
        let margin_ok = confidence - self.current.confidence >= 2.0;
        let direction_changed = direction != self.current.direction;

        let allow_flip =
            direction_changed && (elapsed_ok || confidence_override) && margin_ok && stability >= 0.3;

        let result = if !direction_changed {
            MarketBias {
                direction: self.current.direction,
                confidence,
                regime: internals.regime,
                stability,
                last_changed_at: self.current.last_changed_at,
            }
        } else if allow_flip {
            MarketBias {
                direction,
                confidence,
                regime: internals.regime,
                stability,
                last_changed_at: now,
            }
        } else {
            // Blocked: keep old direction, decay its confidence.
            MarketBias {
                direction: self.current.direction,
                confidence: (self.current.confidence * BLOCKED_DECAY).max(0.0),
                regime: internals.regime,
                stability,
                last_changed_at: self.current.last_changed_at,
            }
        };

        self.push_history(result.direction);
        self.current = result;
        result
    }
}

fn combine(
    a_dir: BiasDirection,
    a_conf: f64,
    b_dir: BiasDirection,
    b_conf: f64,
) -> (BiasDirection, f64) {
    use BiasDirection::*;
    match (a_dir, b_dir) {
        (Neutral, Neutral) => (Neutral, 0.0),
        (Neutral, d) => (d, b_conf),
        (d, Neutral) => (d, a_conf),
        (d1, d2) if d1 == d2 => (d1, a_conf + b_conf),
        _ => {
            if a_conf >= b_conf {
                (a_dir, a_conf - b_conf)
            } else {
                (b_dir, b_conf - a_conf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qte_schemas::{CompositeScores, MarketInternals, TimePhase};

    fn internals_with(bullish: f64, bearish: f64, regime: Regime, phase: TimePhase) -> MarketInternals {
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

    /// BULLISH@5.0, last changed 2 min ago; candidate BEARISH@6.0
    /// must remain BULLISH with confidence decayed to ≈4.75.
    #[test]
    fn s1_bias_flip_blocked_and_decayed() {
        let t0 = Utc::now();
        let mut engine = BiasEngine::new(BiasConfig::default(), t0);
        engine.current = MarketBias {
            direction: BiasDirection::Bullish,
            confidence: 5.0,
            regime: Regime::Normal,
            stability: 1.0,
            last_changed_at: t0,
        };
        engine.direction_history.push_back(BiasDirection::Bullish);

        let now = t0 + chrono::Duration::minutes(2);
        // Strongly bearish internals so the *candidate* would be BEARISH@~6,
        // but hysteresis (elapsed < 5min, confidence 6 < 7 override) blocks it.
        let internals = internals_with(20.0, 50.0, Regime::Normal, TimePhase::Morning);
        let result = engine.update(&internals, 0.0, now);

        assert_eq!(result.direction, BiasDirection::Bullish);
        assert!((result.confidence - 4.75).abs() < 0.5, "got {}", result.confidence);
    }

    #[test]
    fn hysteresis_allows_flip_after_duration_elapses() {
        let t0 = Utc::now();
        let mut engine = BiasEngine::new(BiasConfig::default(), t0);
        engine.current = MarketBias {
            direction: BiasDirection::Bullish,
            confidence: 3.0,
            regime: Regime::Normal,
            stability: 1.0,
            last_changed_at: t0,
        };
        for _ in 0..5 {
            engine.direction_history.push_back(BiasDirection::Bearish);
        }

        let now = t0 + chrono::Duration::minutes(6);
        let internals = internals_with(10.0, 60.0, Regime::Trending, TimePhase::Morning);
        let result = engine.update(&internals, 0.0, now);
        assert_eq!(result.direction, BiasDirection::Bearish);
    }
}
