use std::collections::VecDeque;

/// Minimum number of historical return samples the historical-simulation
/// method needs before it trusts its percentile estimate.
const MIN_SAMPLES: usize = 20;
/// Minimum samples for a position-specific estimate; below this we fall
/// back to a conservative fraction of the portfolio-level VaR.
const MIN_POSITION_SAMPLES: usize = 5;
const POSITION_VAR_FALLBACK_FACTOR: f64 = 0.5;
const MAX_HISTORY: usize = 252;

/// Historical-simulation Value-at-Risk: no distributional assumption, just
/// the empirical percentile of scaled historical daily returns.
#[derive(Clone, Debug, Default)]
pub struct ValueAtRiskCalculator {
    portfolio_returns: VecDeque<f64>,
    position_returns: std::collections::HashMap<String, VecDeque<f64>>,
}

impl ValueAtRiskCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_portfolio_return(&mut self, daily_return: f64) {
        push_bounded(&mut self.portfolio_returns, daily_return, MAX_HISTORY);
    }

    pub fn record_position_return(&mut self, symbol: &str, daily_return: f64) {
        let entry = self
            .position_returns
            .entry(symbol.to_string())
            .or_default();
        push_bounded(entry, daily_return, MAX_HISTORY);
    }

    /// Returns `(var_amount, cvar_amount)`, both non-negative currency
    /// amounts. Requires at least [`MIN_SAMPLES`] return observations;
    /// otherwise both are zero, since a percentile on a handful of points
    /// is not a meaningful risk estimate.
    pub fn calculate_portfolio_var(
        &self,
        portfolio_value: f64,
        time_horizon_days: f64,
        confidence_level: f64,
    ) -> (f64, f64) {
        historical_var(
            self.portfolio_returns.iter().copied(),
            portfolio_value,
            time_horizon_days,
            confidence_level,
        )
    }

    /// Position-level VaR. Falls back to a conservative fraction of
    /// portfolio VaR when the position doesn't have enough history of its
    /// own to trust a dedicated percentile.
    pub fn calculate_position_var(
        &self,
        symbol: &str,
        position_value: f64,
        time_horizon_days: f64,
        confidence_level: f64,
    ) -> f64 {
        let samples = self
            .position_returns
            .get(symbol)
            .map(|v| v.len())
            .unwrap_or(0);

        if samples < MIN_POSITION_SAMPLES {
            let (portfolio_var, _) =
                self.calculate_portfolio_var(position_value, time_horizon_days, confidence_level);
            return portfolio_var * POSITION_VAR_FALLBACK_FACTOR;
        }

        let returns = self.position_returns[symbol].iter().copied();
        let (var, _) = historical_var(returns, position_value, time_horizon_days, confidence_level);
        var
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64, max_len: usize) {
    buf.push_back(value);
    if buf.len() > max_len {
        buf.pop_front();
    }
}

fn historical_var(
    returns: impl Iterator<Item = f64>,
    portfolio_value: f64,
    time_horizon_days: f64,
    confidence_level: f64,
) -> (f64, f64) {
    let mut scaled: Vec<f64> = returns
        .map(|r| r * time_horizon_days.sqrt())
        .collect();

    if scaled.len() < MIN_SAMPLES {
        return (0.0, 0.0);
    }

    scaled.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let tail_pct = (1.0 - confidence_level) * 100.0;
    let var_return = percentile(&scaled, tail_pct);
    let var_amount = (var_return * portfolio_value).abs();

    let tail: Vec<f64> = scaled.iter().copied().filter(|r| *r <= var_return).collect();
    let cvar_return = if tail.is_empty() {
        var_return
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    };
    let cvar_amount = (cvar_return * portfolio_value).abs();

    (var_amount, cvar_amount)
}

/// Linear-interpolation percentile over an already-sorted slice, matching
/// the common "linear" interpolation method used by historical-simulation
/// VaR implementations.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_returns(calc: &mut ValueAtRiskCalculator, values: &[f64]) {
        for v in values {
            calc.record_portfolio_return(*v);
        }
    }

    #[test]
    fn fewer_than_twenty_samples_yields_zero() {
        let mut calc = ValueAtRiskCalculator::new();
        fill_returns(&mut calc, &[-0.01, -0.02, 0.01, 0.02, 0.0]);
        let (var, cvar) = calc.calculate_portfolio_var(1_000_000.0, 1.0, 0.95);
        assert_eq!(var, 0.0);
        assert_eq!(cvar, 0.0);
    }

    #[test]
    fn twenty_samples_produces_nonzero_var() {
        let mut calc = ValueAtRiskCalculator::new();
        // 20 daily returns with a visible left tail.
        let returns: Vec<f64> = vec![
            -0.05, -0.04, -0.03, -0.02, -0.015, -0.01, -0.01, -0.005, -0.005, 0.0, 0.0, 0.005,
            0.005, 0.01, 0.01, 0.015, 0.02, 0.02, 0.03, 0.04,
        ];
        fill_returns(&mut calc, &returns);
        let (var, cvar) = calc.calculate_portfolio_var(1_000_000.0, 1.0, 0.95);
        assert!(var > 0.0);
        assert!(cvar >= var, "cvar ({cvar}) should be at least as extreme as var ({var})");
    }

    #[test]
    fn position_var_falls_back_when_history_thin() {
        let mut calc = ValueAtRiskCalculator::new();
        let returns: Vec<f64> = (0..25).map(|i| -0.01 * (i as f64 % 5.0)).collect();
        fill_returns(&mut calc, &returns);
        calc.record_position_return("RELIANCE", -0.02);

        let (portfolio_var, _) = calc.calculate_portfolio_var(1_000_000.0, 1.0, 0.95);
        let position_var = calc.calculate_position_var("RELIANCE", 1_000_000.0, 1.0, 0.95);
        assert!((position_var - portfolio_var * POSITION_VAR_FALLBACK_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn percentile_linear_interpolation_matches_known_case() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        // 50th percentile of 5 points -> middle element.
        assert_eq!(percentile(&sorted, 50.0), 3.0);
        // 25th percentile -> interpolated between index 1 and index... (4-1)*0.25=0.75 -> between 2 and 3
        assert!((percentile(&sorted, 25.0) - 2.0).abs() < 1e-9);
    }
}
