use rust_decimal::prelude::ToPrimitive;
use qte_schemas::{Action, Quote, Signal};

use crate::{QuoteHistory, Strategy};

/// Breaks out on a run of consecutive higher (lower) LTPs accompanied by
/// above-average volume. Reference producer for the enhancer/dedup/decision
/// pipeline — not itself part of the risk-managed core.
pub struct MomentumBreakout {
    lookback: usize,
    volume_multiple: f64,
}

impl MomentumBreakout {
    pub fn new(lookback: usize, volume_multiple: f64) -> Self {
        Self {
            lookback,
            volume_multiple,
        }
    }
}

impl Default for MomentumBreakout {
    fn default() -> Self {
        Self::new(5, 1.5)
    }
}

impl Strategy for MomentumBreakout {
    fn name(&self) -> &str {
        "momentum_breakout"
    }

    fn on_quote(&mut self, quote: &Quote, history: &QuoteHistory) -> Option<Signal> {
        let recent = history.recent(&quote.symbol);
        if recent.len() < self.lookback + 1 {
            return None;
        }
        let window = &recent[recent.len() - self.lookback - 1..];
        let rising = window.windows(2).all(|w| w[1].ltp > w[0].ltp);
        let falling = window.windows(2).all(|w| w[1].ltp < w[0].ltp);
        if !rising && !falling {
            return None;
        }

        let avg_volume: f64 = window[..window.len() - 1]
            .iter()
            .map(|q| q.volume as f64)
            .sum::<f64>()
            / (window.len() - 1) as f64;
        if avg_volume <= 0.0 || quote.volume as f64 / avg_volume < self.volume_multiple {
            return None;
        }

        let action = if rising { Action::Buy } else { Action::Sell };
        let ltp = quote.ltp.to_f64().unwrap_or_default();
        let move_pct = (window.last().unwrap().ltp - window.first().unwrap().ltp)
            .to_f64()
            .unwrap_or_default()
            .abs()
            / ltp.max(1.0);

        let (stop_loss, target) = match action {
            Action::Buy => (quote.ltp * dec(0.99), quote.ltp * dec(1.02)),
            Action::Sell => (quote.ltp * dec(1.01), quote.ltp * dec(0.98)),
        };

        Some(Signal::new(
            self.name(),
            &quote.symbol,
            action,
            1,
            quote.ltp,
            stop_loss,
            target,
            (move_pct * 20.0).clamp(0.0, 1.0),
            quote.timestamp,
        ))
    }
}

fn dec(v: f64) -> rust_decimal::Decimal {
    rust_decimal::Decimal::try_from(v).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn quote(symbol: &str, ltp: f64, volume: u64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            ltp: Decimal::try_from(ltp).unwrap(),
            open: Decimal::try_from(ltp).unwrap(),
            high: Decimal::try_from(ltp).unwrap(),
            low: Decimal::try_from(ltp).unwrap(),
            prev_close: Decimal::try_from(ltp).unwrap(),
            volume,
            vwap: Decimal::try_from(ltp).unwrap(),
            change_percent: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn no_signal_with_insufficient_history() {
        let mut strat = MomentumBreakout::default();
        let mut history = QuoteHistory::new(50);
        let q = quote("RELIANCE", 100.0, 1000);
        assert!(strat.on_quote(&q, &history).is_none());
        history.push(&q);
    }

    #[test]
    fn rising_prices_with_volume_surge_emits_buy() {
        let mut strat = MomentumBreakout::default();
        let mut history = QuoteHistory::new(50);
        for (price, vol) in [
            (100.0, 1000u64),
            (100.5, 1000),
            (101.0, 1000),
            (101.5, 1000),
            (102.0, 1000),
        ] {
            history.push(&quote("RELIANCE", price, vol));
        }
        let breakout = quote("RELIANCE", 103.0, 3000);
        history.push(&breakout);
        let signal = strat.on_quote(&breakout, &history);
        assert!(signal.is_some());
        assert_eq!(signal.unwrap().action, Action::Buy);
    }

    #[test]
    fn rising_prices_without_volume_surge_emits_nothing() {
        let mut strat = MomentumBreakout::default();
        let mut history = QuoteHistory::new(50);
        for price in [100.0, 100.5, 101.0, 101.5, 102.0] {
            history.push(&quote("RELIANCE", price, 1000));
        }
        let breakout = quote("RELIANCE", 102.5, 1000);
        history.push(&breakout);
        assert!(strat.on_quote(&breakout, &history).is_none());
    }
}
