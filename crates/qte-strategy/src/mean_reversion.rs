use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use qte_schemas::{Action, Quote, Signal};

use crate::{QuoteHistory, Strategy};

/// Fades deviations from VWAP: a large discount to VWAP is read as a buy
/// (expect reversion up), a large premium as a sell.
pub struct VwapMeanReversion {
    deviation_threshold_pct: f64,
}

impl VwapMeanReversion {
    pub fn new(deviation_threshold_pct: f64) -> Self {
        Self {
            deviation_threshold_pct,
        }
    }
}

impl Default for VwapMeanReversion {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl Strategy for VwapMeanReversion {
    fn name(&self) -> &str {
        "vwap_mean_reversion"
    }

    fn on_quote(&mut self, quote: &Quote, _history: &QuoteHistory) -> Option<Signal> {
        if quote.vwap.is_zero() {
            return None;
        }
        let deviation_pct = ((quote.ltp - quote.vwap) / quote.vwap * Decimal::from(100))
            .to_f64()
            .unwrap_or_default();

        if deviation_pct.abs() < self.deviation_threshold_pct {
            return None;
        }

        let (action, stop_loss, target) = if deviation_pct < 0.0 {
            (Action::Buy, quote.ltp * dec(0.99), quote.vwap)
        } else {
            (Action::Sell, quote.ltp * dec(1.01), quote.vwap)
        };

        let confidence = (deviation_pct.abs() / (self.deviation_threshold_pct * 3.0)).clamp(0.3, 1.0);

        Some(Signal::new(
            self.name(),
            &quote.symbol,
            action,
            1,
            quote.ltp,
            stop_loss,
            target,
            confidence,
            quote.timestamp,
        ))
    }
}

fn dec(v: f64) -> Decimal {
    Decimal::try_from(v).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(ltp: f64, vwap: f64) -> Quote {
        Quote {
            symbol: "RELIANCE".to_string(),
            ltp: Decimal::try_from(ltp).unwrap(),
            open: Decimal::try_from(ltp).unwrap(),
            high: Decimal::try_from(ltp).unwrap(),
            low: Decimal::try_from(ltp).unwrap(),
            prev_close: Decimal::try_from(ltp).unwrap(),
            volume: 1000,
            vwap: Decimal::try_from(vwap).unwrap(),
            change_percent: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn discount_to_vwap_emits_buy() {
        let mut strat = VwapMeanReversion::default();
        let history = QuoteHistory::new(50);
        let q = quote(98.0, 100.0);
        let signal = strat.on_quote(&q, &history).expect("signal");
        assert_eq!(signal.action, Action::Buy);
        assert_eq!(signal.target, q.vwap);
    }

    #[test]
    fn premium_to_vwap_emits_sell() {
        let mut strat = VwapMeanReversion::default();
        let history = QuoteHistory::new(50);
        let q = quote(102.0, 100.0);
        let signal = strat.on_quote(&q, &history).expect("signal");
        assert_eq!(signal.action, Action::Sell);
    }

    #[test]
    fn small_deviation_emits_nothing() {
        let mut strat = VwapMeanReversion::default();
        let history = QuoteHistory::new(50);
        let q = quote(100.2, 100.0);
        assert!(strat.on_quote(&q, &history).is_none());
    }
}
