use qte_schemas::{Breadth, CompositeScores, Regime, VolumeProfile};

/// Sector leadership classification, supplied by the caller (a real system
/// would derive this from a sector-breadth feed; the analyzer takes it as
/// an input rather than hard-coding a sector taxonomy).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectorLeadership {
    Cyclical,
    Defensive,
    Mixed,
}

/// Composite Bullish/Bearish/Neutral scores, normalized to sum to 100.
/// Weights: breadth 35%, volume 25%, volatility 20%,
/// regime 15%, sector-rotation 5%.
pub fn composite_scores(
    breadth: &Breadth,
    volume: &VolumeProfile,
    vix: f64,
    regime: Regime,
    sector: SectorLeadership,
) -> CompositeScores {
    // Each sub-score is first mapped into a bullish lean in [-1, 1].
    let breadth_lean = ((breadth.advance_decline_ratio - 1.0) / 1.0).clamp(-1.0, 1.0);
    let volume_lean = ((volume.up_volume_ratio - 0.5) * 2.0).clamp(-1.0, 1.0);

    // High VIX decays bullish conviction.
    let vix_decay = if vix > 25.0 {
        -0.4
    } else if vix > 20.0 {
        -0.2
    } else {
        0.0
    };
    let volatility_lean = vix_decay;

    let regime_lean = match regime {
        Regime::Trending | Regime::VolatileTrending => {
            if breadth_lean >= 0.0 {
                0.5
            } else {
                -0.5
            }
        }
        Regime::Choppy | Regime::VolatileChoppy => 0.0,
        Regime::Quiet | Regime::Normal => 0.0,
    };

    let sector_lean = match sector {
        SectorLeadership::Cyclical => 0.3,
        SectorLeadership::Defensive => -0.3,
        SectorLeadership::Mixed => 0.0,
    };

    let weighted = breadth_lean * 0.35
        + volume_lean * 0.25
        + volatility_lean * 0.20
        + regime_lean * 0.15
        + sector_lean * 0.05;

    // Map weighted lean in [-1, 1] to bullish/bearish/neutral summing to 100.
    let bullish_raw = ((weighted + 1.0) / 2.0).clamp(0.0, 1.0);
    let bearish_raw = 1.0 - bullish_raw;
    let conviction = weighted.abs().clamp(0.0, 1.0);

    let bullish = bullish_raw * conviction * 100.0;
    let bearish = bearish_raw * conviction * 100.0;
    let neutral = 100.0 - bullish - bearish;

    CompositeScores {
        bullish,
        bearish,
        neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_sum_to_100() {
        let breadth = Breadth {
            advance_decline_ratio: 1.5,
            cumulative_ad_line: 10.0,
            pct_above_vwap: 60.0,
            new_highs_minus_lows: 5,
        };
        let volume = VolumeProfile {
            up_volume_ratio: 0.65,
            volume_breadth: 10.0,
            institutional_flow_proxy: 0.1,
        };
        let s = composite_scores(&breadth, &volume, 15.0, Regime::Trending, SectorLeadership::Cyclical);
        let sum = s.bullish + s.bearish + s.neutral;
        assert!((sum - 100.0).abs() < 0.2, "sum was {sum}");
    }

    #[test]
    fn deterministic_repeat_invocation() {
        let breadth = Breadth {
            advance_decline_ratio: 0.7,
            cumulative_ad_line: -5.0,
            pct_above_vwap: 30.0,
            new_highs_minus_lows: -3,
        };
        let volume = VolumeProfile {
            up_volume_ratio: 0.35,
            volume_breadth: -8.0,
            institutional_flow_proxy: -0.1,
        };
        let a = composite_scores(&breadth, &volume, 22.0, Regime::Choppy, SectorLeadership::Defensive);
        let b = composite_scores(&breadth, &volume, 22.0, Regime::Choppy, SectorLeadership::Defensive);
        assert_eq!(a.bullish, b.bullish);
        assert_eq!(a.bearish, b.bearish);
        assert_eq!(a.neutral, b.neutral);
    }
}
