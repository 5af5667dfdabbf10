use qte_schemas::{Breadth, Regime, Volatility};

/// Trend-strength score in `[0, 100]`: a simple composite of breadth skew
/// and intraday move magnitude, used as a tiebreaker in regime detection
/// and fed to the bias engine.
pub fn trend_strength(breadth: &Breadth, nifty_change_pct: f64) -> f64 {
    let ad_component = ((breadth.advance_decline_ratio - 1.0).abs() * 40.0).min(50.0);
    let move_component = (nifty_change_pct.abs() * 30.0).min(50.0);
    (ad_component + move_component).min(100.0)
}

/// Regime detection, applied in strict priority order.
pub fn detect_regime(
    nifty_change_pct: f64,
    ad_ratio: f64,
    vix: f64,
    choppiness: f64,
    trend_strength_score: f64,
    avg_intraday_range_pct: f64,
) -> Regime {
    let strong_move = nifty_change_pct.abs() >= 0.5;
    let ad_extreme = ad_ratio >= 1.2 || ad_ratio < 0.8;

    if strong_move && ad_extreme {
        return if vix > 25.0 {
            Regime::VolatileTrending
        } else {
            Regime::Trending
        };
    }

    if choppiness > 61.8 && nifty_change_pct.abs() < 0.5 {
        return if vix > 20.0 {
            Regime::VolatileChoppy
        } else {
            Regime::Choppy
        };
    }

    if trend_strength_score > 60.0 {
        return Regime::Trending;
    }

    if avg_intraday_range_pct < 0.5 {
        return Regime::Quiet;
    }

    Regime::Normal
}

pub fn volatility_regime_inputs(volatility: &Volatility) -> (f64, f64) {
    (volatility.india_vix, volatility.avg_intraday_range_pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Boundary case: NIFTY change exactly 0.5% with A/D == 1.2 → TRENDING.
    #[test]
    fn boundary_trending_at_exact_thresholds() {
        let r = detect_regime(0.5, 1.2, 10.0, 0.0, 0.0, 0.0);
        assert_eq!(r, Regime::Trending);
    }

    #[test]
    fn volatile_trending_when_vix_high() {
        let r = detect_regime(0.7, 1.3, 30.0, 0.0, 0.0, 0.0);
        assert_eq!(r, Regime::VolatileTrending);
    }
}
