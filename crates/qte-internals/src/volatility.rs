use qte_schemas::{MarketSnapshot, Volatility};
use rust_decimal::prelude::ToPrimitive;

use crate::candle::Candle;

/// Distinct-candle floor for a trustworthy choppiness index: never feed
/// the same day's OHLC repeatedly.
pub const CHOPPINESS_WINDOW: usize = 14;

pub fn compute_volatility(
    snapshot: &MarketSnapshot,
    india_vix: f64,
    india_vix_prev: f64,
    realized_vol: f64,
) -> Volatility {
    let ranges: Vec<f64> = snapshot
        .quotes
        .iter()
        .filter_map(|q| q.intraday_range_pct().to_f64())
        .collect();

    let avg_intraday_range_pct = if ranges.is_empty() {
        0.0
    } else {
        ranges.iter().sum::<f64>() / ranges.len() as f64 * 100.0
    };

    Volatility {
        avg_intraday_range_pct,
        india_vix,
        india_vix_change: india_vix - india_vix_prev,
        realized_vol,
    }
}

/// Choppiness index:
///
/// `100 * log10(sum(true_range) / (highest_high - lowest_low)) / log10(N)`
/// over `N = CHOPPINESS_WINDOW` distinct five-minute candles.
///
/// Falls back to a range-based heuristic (never to stored same-day OHLC)
/// when fewer than `CHOPPINESS_WINDOW` candles are available, using the
/// current intraday `|change_percent|` of the reference symbol (NIFTY).
pub fn choppiness_index(candles: &[Candle], nifty_change_pct_abs: f64) -> f64 {
    if candles.len() < CHOPPINESS_WINDOW {
        return choppiness_fallback(nifty_change_pct_abs);
    }

    let window = &candles[candles.len() - CHOPPINESS_WINDOW..];

    let mut atr_sum = 0.0f64;
    for i in 1..window.len() {
        let high = window[i].high.to_f64().unwrap_or(0.0);
        let low = window[i].low.to_f64().unwrap_or(0.0);
        let prev_close = window[i - 1].close.to_f64().unwrap_or(0.0);
        if high <= 0.0 || low <= 0.0 || prev_close <= 0.0 {
            continue;
        }
        let true_range = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        atr_sum += true_range;
    }

    let highest = window
        .iter()
        .map(|c| c.high.to_f64().unwrap_or(0.0))
        .fold(f64::MIN, f64::max);
    let lowest = window
        .iter()
        .map(|c| c.low.to_f64().unwrap_or(f64::MAX))
        .fold(f64::MAX, f64::min);

    if highest <= lowest || atr_sum <= 0.0 {
        return choppiness_fallback(nifty_change_pct_abs);
    }

    let n = window.len() as f64;
    100.0 * (atr_sum / (highest - lowest)).log10() / n.log10()
}

fn choppiness_fallback(intraday_change_pct_abs: f64) -> f64 {
    if intraday_change_pct_abs < 0.2 {
        75.0
    } else if intraday_change_pct_abs < 0.4 {
        60.0
    } else if intraday_change_pct_abs < 0.6 {
        50.0
    } else if intraday_change_pct_abs < 1.0 {
        40.0
    } else {
        30.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open: rust_decimal::Decimal::try_from(close).unwrap(),
            high: rust_decimal::Decimal::try_from(high).unwrap(),
            low: rust_decimal::Decimal::try_from(low).unwrap(),
            close: rust_decimal::Decimal::try_from(close).unwrap(),
            volume: 1000,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn falls_back_below_window_size() {
        let candles = vec![candle(100.0, 99.0, 99.5); 5];
        let v = choppiness_index(&candles, 0.1);
        assert_eq!(v, 75.0);
    }

    #[test]
    fn uses_real_candles_when_enough_distinct() {
        let mut candles = Vec::new();
        let mut px = 100.0;
        for i in 0..20 {
            let high = px + 0.5;
            let low = px - 0.5;
            candles.push(candle(high, low, px));
            px += if i % 2 == 0 { 0.3 } else { -0.1 };
        }
        let v = choppiness_index(&candles, 0.1);
        assert!(v.is_finite());
        assert!(v > 0.0 && v <= 150.0);
    }
}
