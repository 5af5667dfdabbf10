use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// An intraday OHLCV candle, as returned by a broker's historical-data API.
///
/// The analyzer never fetches these itself — it performs no IO, keeping
/// blocking calls off the monitor's loop thread — the caller supplies up to
/// `choppiness_window` recent, *distinct* candles each tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}
