use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Last-known snapshot for one symbol, written by the feed adapter.
///
/// `change_percent` is frequently absent on the wire; [`Quote::change_percent`]
/// recomputes it from `(ltp - open) / open` when so.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub ltp: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub prev_close: Decimal,
    pub volume: u64,
    pub vwap: Decimal,
    pub change_percent: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// `change_percent`, recomputing from ltp/open when the feed omitted it.
    pub fn change_percent(&self) -> Decimal {
        match self.change_percent {
            Some(cp) => cp,
            None => {
                if self.open.is_zero() {
                    Decimal::ZERO
                } else {
                    (self.ltp - self.open) / self.open * Decimal::from(100)
                }
            }
        }
    }

    /// Intraday range as a fraction of LTP: (high - low) / ltp. Zero if ltp is zero.
    pub fn intraday_range_pct(&self) -> Decimal {
        if self.ltp.is_zero() {
            Decimal::ZERO
        } else {
            (self.high - self.low) / self.ltp
        }
    }

    /// True if within 2% of a 52-week high, used as the new-high proxy.
    pub fn near_year_high(&self, year_high: Decimal) -> bool {
        if year_high.is_zero() {
            return false;
        }
        let gap = (year_high - self.ltp) / year_high;
        gap.abs() <= Decimal::new(2, 2)
    }

    pub fn near_year_low(&self, year_low: Decimal) -> bool {
        if year_low.is_zero() {
            return false;
        }
        let gap = (self.ltp - year_low) / year_low;
        gap.abs() <= Decimal::new(2, 2)
    }
}

/// Whole-market snapshot passed to the internals analyzer once per tick batch.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: Vec<Quote>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn get(&self, symbol: &str) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.symbol == symbol)
    }
}
