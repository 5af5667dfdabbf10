use qte_schemas::{Breadth, MarketSnapshot};
use rust_decimal::Decimal;

/// Rolling cumulative advance/decline line, maintained by the caller across
/// ticks (the analyzer itself is stateless-per-call; the line needs a
/// running total so it's threaded through as mutable state).
#[derive(Clone, Debug, Default)]
pub struct BreadthHistory {
    pub cumulative_ad_line: f64,
}

/// Computes breadth metrics for one snapshot.
///
/// - advance/decline ratio: advancing ÷ declining, where a stock counts as
///   advancing/declining only if `|change_percent| > 0.1%`.
/// - % of stocks above VWAP.
/// - new-52w-highs minus new-52w-lows, proxied by "within 2% of
///   year_high/year_low" since the analyzer has no separate 52-week feed;
///   callers that have real year highs/lows pass them via `year_extremes`.
pub fn compute_breadth(
    snapshot: &MarketSnapshot,
    year_extremes: &dyn Fn(&str) -> Option<(Decimal, Decimal)>,
    history: &mut BreadthHistory,
) -> Breadth {
    // change_percent() already returns a percent value (e.g. 0.5 for 0.5%),
    // so the 0.1% threshold is the literal value 0.1.
    let threshold_pct = Decimal::new(1, 1);

    let mut advancing = 0i64;
    let mut declining = 0i64;
    let mut above_vwap = 0i64;
    let mut new_highs = 0i64;
    let mut new_lows = 0i64;
    let total = snapshot.quotes.len().max(1) as f64;

    for q in &snapshot.quotes {
        let cp = q.change_percent();
        if cp.abs() > threshold_pct {
            if cp > Decimal::ZERO {
                advancing += 1;
            } else {
                declining += 1;
            }
        }
        if q.ltp >= q.vwap {
            above_vwap += 1;
        }
        if let Some((year_high, year_low)) = year_extremes(&q.symbol) {
            if q.near_year_high(year_high) {
                new_highs += 1;
            }
            if q.near_year_low(year_low) {
                new_lows += 1;
            }
        }
    }

    let ad_ratio = if declining == 0 {
        if advancing == 0 {
            1.0
        } else {
            advancing as f64 * 2.0 // strongly bullish breadth, no decliners to divide by
        }
    } else {
        advancing as f64 / declining as f64
    };

    history.cumulative_ad_line += (advancing - declining) as f64;

    Breadth {
        advance_decline_ratio: ad_ratio,
        cumulative_ad_line: history.cumulative_ad_line,
        pct_above_vwap: (above_vwap as f64 / total) * 100.0,
        new_highs_minus_lows: new_highs - new_lows,
    }
}
