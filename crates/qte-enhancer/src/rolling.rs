use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const CAPACITY: usize = 50;

#[derive(Clone, Copy, Debug)]
struct Sample {
    ltp: f64,
    volume: u64,
}

/// Per-symbol rolling window of the last 50 (ltp, volume) samples.
#[derive(Default)]
pub struct SymbolWindows {
    windows: HashMap<String, Vec<Sample>>,
}

impl SymbolWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: &str, ltp: Decimal, volume: u64) {
        let buf = self.windows.entry(symbol.to_string()).or_default();
        buf.push(Sample {
            ltp: ltp.to_f64().unwrap_or_default(),
            volume,
        });
        if buf.len() > CAPACITY {
            buf.remove(0);
        }
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.windows.get(symbol).map(Vec::len).unwrap_or(0)
    }

    /// Return over the last `n` samples (requires `n+1` samples present).
    pub fn return_over(&self, symbol: &str, n: usize) -> Option<f64> {
        let buf = self.windows.get(symbol)?;
        if buf.len() < n + 1 {
            return None;
        }
        let last = buf.last()?.ltp;
        let base = buf[buf.len() - 1 - n].ltp;
        if base == 0.0 {
            return None;
        }
        Some((last - base) / base)
    }

    /// Mean volume over the last `n` samples, excluding the most recent one.
    pub fn avg_volume_excluding_latest(&self, symbol: &str, n: usize) -> Option<f64> {
        let buf = self.windows.get(symbol)?;
        if buf.len() < n + 1 {
            return None;
        }
        let slice = &buf[buf.len() - 1 - n..buf.len() - 1];
        Some(slice.iter().map(|s| s.volume as f64).sum::<f64>() / slice.len() as f64)
    }

    pub fn latest_volume(&self, symbol: &str) -> Option<u64> {
        self.windows.get(symbol).and_then(|b| b.last()).map(|s| s.volume)
    }
}
