//! qte-internals — Market Internals Analyzer.
//!
//! Pure compute over a [`MarketSnapshot`]: breadth, volume, volatility,
//! regime, and composite scores. No IO, no broker calls — the caller
//! supplies prefetched candles (for choppiness) and any reference-index
//! extras (VIX, NIFTY change) that aren't in the quote snapshot itself.
//!
//! Per the analyzer's failure model, a failing subcomputation must never
//! propagate — [`analyze`] never panics and never returns an error; a
//! degraded input naturally produces scores centered on neutral because
//! every sub-function is total over its inputs.

mod breadth;
mod candle;
mod regime;
mod scores;
mod time_phase;
mod volatility;
mod volume;

pub use breadth::{compute_breadth, BreadthHistory};
pub use candle::Candle;
pub use regime::{detect_regime, trend_strength};
pub use scores::{composite_scores, SectorLeadership};
pub use time_phase::time_phase;
pub use volatility::{choppiness_index, compute_volatility, CHOPPINESS_WINDOW};
pub use volume::compute_volume_profile;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use qte_schemas::{MarketInternals, MarketSnapshot};

/// Everything `analyze` needs that isn't carried on the `MarketSnapshot`
/// itself.
pub struct AnalysisInputs<'a> {
    pub nifty_change_pct: f64,
    pub india_vix: f64,
    pub india_vix_prev: f64,
    pub realized_vol: f64,
    pub nifty_candles: &'a [Candle],
    pub sector: SectorLeadership,
    pub ist_time: NaiveTime,
    pub year_extremes: &'a dyn Fn(&str) -> Option<(Decimal, Decimal)>,
}

/// Runs the full internals analysis for one tick batch.
pub fn analyze(
    snapshot: &MarketSnapshot,
    inputs: &AnalysisInputs,
    history: &mut BreadthHistory,
) -> MarketInternals {
    let breadth = compute_breadth(snapshot, inputs.year_extremes, history);
    let volume = compute_volume_profile(snapshot);
    let volatility = compute_volatility(
        snapshot,
        inputs.india_vix,
        inputs.india_vix_prev,
        inputs.realized_vol,
    );
    let choppiness = choppiness_index(inputs.nifty_candles, inputs.nifty_change_pct.abs());
    let strength = trend_strength(&breadth, inputs.nifty_change_pct);
    let regime = detect_regime(
        inputs.nifty_change_pct,
        breadth.advance_decline_ratio,
        inputs.india_vix,
        choppiness,
        strength,
        volatility.avg_intraday_range_pct,
    );
    let scores = composite_scores(&breadth, &volume, inputs.india_vix, regime, inputs.sector);
    let phase = time_phase(inputs.ist_time);

    MarketInternals {
        breadth,
        volume,
        volatility,
        choppiness_index: choppiness,
        trend_strength: strength,
        regime,
        time_phase: phase,
        scores,
        nifty_change_pct: inputs.nifty_change_pct,
    }
}
