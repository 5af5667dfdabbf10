//! qte-enhancer — Signal Enhancer.
//!
//! Rescoring pass between the strategy pool and the deduplicator: scores
//! every candidate signal against rolling per-symbol price/volume history
//! and the emitting strategy's recent track record, then either rewrites
//! its confidence or drops it outright.

mod rolling;
mod scoreboard;
mod warmup;

pub use scoreboard::Scoreboard;
pub use warmup::{warmup, CandleSource};

use rolling::SymbolWindows;
use rust_decimal::prelude::ToPrimitive;
use qte_schemas::{Action, Quote, Signal};

const ACCEPT_THRESHOLD: f64 = 0.60;

const WEIGHT_CONFLUENCE: f64 = 0.30;
const WEIGHT_VOLUME: f64 = 0.25;
const WEIGHT_MICROSTRUCTURE: f64 = 0.25;
const WEIGHT_TIMEFRAME: f64 = 0.20;

pub struct SignalEnhancer {
    windows: SymbolWindows,
    scoreboard: Scoreboard,
}

impl SignalEnhancer {
    pub fn new() -> Self {
        Self {
            windows: SymbolWindows::new(),
            scoreboard: Scoreboard::new(),
        }
    }

    pub fn scoreboard_mut(&mut self) -> &mut Scoreboard {
        &mut self.scoreboard
    }

    /// Feeds one incoming quote into the rolling windows. Must be called
    /// for every quote tick, independent of whether it produced a signal,
    /// so the windows stay current for the next signal that arrives.
    pub fn observe_quote(&mut self, quote: &Quote) {
        self.windows.push(&quote.symbol, quote.ltp, quote.volume);
    }

    /// Seeds the rolling window for `symbol` with one historical (price,
    /// volume) sample. Used by [`warmup`] to backfill from candles before
    /// live quotes start arriving.
    pub fn seed(&mut self, symbol: &str, ltp: rust_decimal::Decimal, volume: u64) {
        self.windows.push(symbol, ltp, volume);
    }

    /// Rescales or drops `signal` based on confluence, volume quality,
    /// microstructure, and timeframe-alignment scores plus the emitting
    /// strategy's performance factor.
    pub fn enhance(&self, signal: &Signal, quote: &Quote) -> Option<Signal> {
        let confluence = self.confluence_score(signal, quote);
        let volume_quality = self.volume_quality_score(&signal.symbol, quote);
        let microstructure = microstructure_score(quote);
        let timeframe = self.timeframe_alignment_score(&signal.symbol);

        let enhancement_score = confluence * WEIGHT_CONFLUENCE
            + volume_quality * WEIGHT_VOLUME
            + microstructure * WEIGHT_MICROSTRUCTURE
            + timeframe * WEIGHT_TIMEFRAME;

        if enhancement_score < ACCEPT_THRESHOLD {
            return None;
        }

        let performance_factor = self.scoreboard.performance_factor(&signal.strategy_name);
        let new_confidence = (signal.confidence * enhancement_score * performance_factor).min(10.0);

        let mut enhanced = signal.clone();
        enhanced.confidence = new_confidence;
        Some(enhanced)
    }

    fn confluence_score(&self, signal: &Signal, quote: &Quote) -> f64 {
        let momentum = self.windows.return_over(&signal.symbol, 5);
        let avg_volume = self.windows.avg_volume_excluding_latest(&signal.symbol, 20);

        let (Some(momentum), Some(avg_volume)) = (momentum, avg_volume) else {
            // Insufficient history: fall back to the signal's own confidence
            // mapped into [0.65, 0.85].
            return 0.65 + (signal.confidence / 10.0).clamp(0.0, 1.0) * 0.20;
        };

        let momentum_aligned = match signal.action {
            Action::Buy => momentum > 0.0,
            Action::Sell => momentum < 0.0,
        };
        let momentum_score = if momentum_aligned { 1.0 } else { 0.0 };

        let volume_ratio = if avg_volume > 0.0 {
            quote.volume as f64 / avg_volume
        } else {
            0.0
        };
        let volume_score = if volume_ratio >= 1.5 { 1.0 } else { (volume_ratio / 1.5).clamp(0.0, 1.0) };

        let change_pct = quote.change_percent().to_f64().unwrap_or_default();
        let structure_aligned = match signal.action {
            Action::Buy => change_pct >= 0.0,
            Action::Sell => change_pct <= 0.0,
        };
        let structure_score = if structure_aligned { 1.0 } else { 0.0 };

        (momentum_score + volume_score + structure_score) / 3.0
    }

    fn volume_quality_score(&self, symbol: &str, quote: &Quote) -> f64 {
        let avg_volume = match self.windows.avg_volume_excluding_latest(symbol, 20) {
            Some(v) if v > 0.0 => v,
            _ => return 0.5,
        };
        let ratio = quote.volume as f64 / avg_volume;
        if ratio >= 2.0 {
            1.0
        } else if ratio >= 1.5 {
            0.9
        } else if ratio >= 1.2 {
            0.8
        } else if ratio >= 0.8 {
            0.65
        } else {
            0.5
        }
    }

    fn timeframe_alignment_score(&self, symbol: &str) -> f64 {
        let returns = [
            self.windows.return_over(symbol, 3),
            self.windows.return_over(symbol, 10),
            self.windows.return_over(symbol, 20),
        ];
        let signs: Vec<i32> = returns
            .iter()
            .filter_map(|r| r.map(|v| if v >= 0.0 { 1 } else { -1 }))
            .collect();
        if signs.len() < 3 {
            return 0.5;
        }
        let positive = signs.iter().filter(|s| **s > 0).count();
        if positive == 3 || positive == 0 {
            1.0
        } else if positive == 2 || positive == 1 {
            0.5
        } else {
            0.0
        }
    }
}

impl Default for SignalEnhancer {
    fn default() -> Self {
        Self::new()
    }
}

fn microstructure_score(quote: &Quote) -> f64 {
    let ltp = quote.ltp.to_f64().unwrap_or_default();
    if ltp <= 0.0 {
        return 0.55;
    }
    let spread_pct =
        ((quote.high - quote.low).to_f64().unwrap_or_default() / ltp * 100.0).abs();
    if spread_pct < 1.0 {
        1.0
    } else if spread_pct < 2.0 {
        0.85
    } else if spread_pct < 4.0 {
        0.70
    } else {
        0.55
    }
}
