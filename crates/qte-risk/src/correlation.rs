use std::collections::{HashMap, VecDeque};

const MAX_HISTORY: usize = 60;
const MIN_OVERLAP: usize = 10;

/// Rolling per-symbol return history with on-demand Pearson correlation.
///
/// A symbol with insufficient overlapping history against another is
/// treated as uncorrelated-unknown by the caller, which fails closed (see
/// [`crate::RiskManager::would_exceed_correlation_limit`]).
#[derive(Clone, Debug, Default)]
pub struct CorrelationTracker {
    returns: HashMap<String, VecDeque<f64>>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_return(&mut self, symbol: &str, daily_return: f64) {
        let entry = self.returns.entry(symbol.to_string()).or_default();
        entry.push_back(daily_return);
        if entry.len() > MAX_HISTORY {
            entry.pop_front();
        }
    }

    /// Pearson correlation between `a` and `b` over their most recent
    /// overlapping observations. `None` when either symbol lacks enough
    /// history to compute a meaningful estimate.
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        if a == b {
            return Some(1.0);
        }
        let xs = self.returns.get(a)?;
        let ys = self.returns.get(b)?;
        let n = xs.len().min(ys.len());
        if n < MIN_OVERLAP {
            return None;
        }

        let xs: Vec<f64> = xs.iter().rev().take(n).copied().collect();
        let ys: Vec<f64> = ys.iter().rev().take(n).copied().collect();

        let mean_x = xs.iter().sum::<f64>() / n as f64;
        let mean_y = ys.iter().sum::<f64>() / n as f64;

        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for i in 0..n {
            let dx = xs[i] - mean_x;
            let dy = ys[i] - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }

        if var_x <= 0.0 || var_y <= 0.0 {
            return Some(0.0);
        }

        Some(cov / (var_x.sqrt() * var_y.sqrt()))
    }

    /// The highest-magnitude correlation between `symbol` and any symbol in
    /// `held`. `None` when no held symbol has enough overlapping history.
    pub fn max_correlation_against(&self, symbol: &str, held: &[String]) -> Option<f64> {
        held.iter()
            .filter(|s| s.as_str() != symbol)
            .filter_map(|s| self.correlation(symbol, s))
            .map(|c| c.abs())
            .fold(None, |acc, c| Some(acc.map_or(c, |a: f64| a.max(c))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_series_is_perfectly_correlated() {
        let mut tracker = CorrelationTracker::new();
        for i in 0..15 {
            let r = (i as f64) * 0.001 - 0.005;
            tracker.record_return("A", r);
            tracker.record_return("B", r);
        }
        let corr = tracker.correlation("A", "B").unwrap();
        assert!((corr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_series_is_perfectly_anti_correlated() {
        let mut tracker = CorrelationTracker::new();
        for i in 0..15 {
            let r = (i as f64) * 0.001 - 0.005;
            tracker.record_return("A", r);
            tracker.record_return("B", -r);
        }
        let corr = tracker.correlation("A", "B").unwrap();
        assert!((corr + 1.0).abs() < 1e-9);
    }

    #[test]
    fn insufficient_overlap_returns_none() {
        let mut tracker = CorrelationTracker::new();
        tracker.record_return("A", 0.01);
        tracker.record_return("B", 0.01);
        assert!(tracker.correlation("A", "B").is_none());
    }

    #[test]
    fn unknown_symbol_returns_none() {
        let tracker = CorrelationTracker::new();
        assert!(tracker.correlation("A", "B").is_none());
    }
}
