use qte_internals::Candle;

use crate::SignalEnhancer;

const WARMUP_DAYS: u32 = 3;
const MAX_SYMBOLS: usize = 50;

/// Historical 5-minute candle source, implemented by the broker adapter in
/// the daemon. Kept separate from the broker trait itself so the enhancer
/// has no dependency on execution/broker crates.
pub trait CandleSource {
    fn fetch_recent(&self, symbol: &str, days: u32) -> Vec<Candle>;
}

/// Backfills the rolling windows for up to the first 50 `symbols` with up
/// to 3 days of 5-minute candles, so enhancement scores are meaningful
/// within minutes of startup instead of only after a full trading day of
/// live quotes has accumulated.
pub fn warmup(enhancer: &mut SignalEnhancer, symbols: &[String], source: &dyn CandleSource) {
    for symbol in symbols.iter().take(MAX_SYMBOLS) {
        let candles = source.fetch_recent(symbol, WARMUP_DAYS);
        for candle in candles {
            enhancer.seed(symbol, candle.close, candle.volume);
        }
    }
}
