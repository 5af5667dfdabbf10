use serde::{Deserialize, Serialize};

use crate::Regime;

/// Time-of-day phase used to modulate bias confidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimePhase {
    Opening,
    Morning,
    Afternoon,
    Closing,
    Other,
}

impl TimePhase {
    pub fn confidence_multiplier(self) -> f64 {
        match self {
            TimePhase::Opening => 1.2,
            TimePhase::Morning => 1.0,
            TimePhase::Afternoon => 0.9,
            TimePhase::Closing => 1.1,
            TimePhase::Other => 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Breadth {
    pub advance_decline_ratio: f64,
    pub cumulative_ad_line: f64,
    pub pct_above_vwap: f64,
    pub new_highs_minus_lows: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub up_volume_ratio: f64,
    pub volume_breadth: f64,
    pub institutional_flow_proxy: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Volatility {
    pub avg_intraday_range_pct: f64,
    pub india_vix: f64,
    pub india_vix_change: f64,
    pub realized_vol: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeScores {
    pub bullish: f64,
    pub bearish: f64,
    pub neutral: f64,
}

/// Output of the market internals analyzer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketInternals {
    pub breadth: Breadth,
    pub volume: VolumeProfile,
    pub volatility: Volatility,
    pub choppiness_index: f64,
    pub trend_strength: f64,
    pub regime: Regime,
    pub time_phase: TimePhase,
    pub scores: CompositeScores,
    /// NIFTY intraday change percent, carried through for the bias engine.
    pub nifty_change_pct: f64,
}

impl Default for MarketInternals {
    /// Neutral defaults emitted when a subcomputation fails — never
    /// propagate, degrade to neutral.
    fn default() -> Self {
        Self {
            breadth: Breadth::default(),
            volume: VolumeProfile::default(),
            volatility: Volatility::default(),
            choppiness_index: 50.0,
            trend_strength: 0.0,
            regime: Regime::Normal,
            time_phase: TimePhase::Other,
            scores: CompositeScores {
                bullish: 33.3,
                bearish: 33.3,
                neutral: 33.4,
            },
            nifty_change_pct: 0.0,
        }
    }
}
