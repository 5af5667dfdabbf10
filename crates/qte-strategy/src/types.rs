use std::collections::HashMap;

use qte_schemas::{Quote, Signal};

/// Bounded per-symbol quote history shared with every registered strategy.
///
/// Strategies never mutate history directly — [`StrategyPool`](crate::StrategyPool)
/// owns the push; strategies only read the window they're handed.
pub struct QuoteHistory {
    window: HashMap<String, Vec<Quote>>,
    capacity: usize,
}

impl QuoteHistory {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            window: HashMap::new(),
            capacity,
        }
    }

    pub fn push(&mut self, quote: &Quote) {
        let buf = self.window.entry(quote.symbol.clone()).or_default();
        buf.push(quote.clone());
        if buf.len() > self.capacity {
            buf.remove(0);
        }
    }

    /// Most recent quotes for `symbol`, oldest first, newest last.
    pub fn recent(&self, symbol: &str) -> &[Quote] {
        self.window.get(symbol).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Strategy contract: given one incoming quote and the rolling history up to
/// and including it, optionally emit a candidate [`Signal`].
///
/// Strategies hold no broker/DB handles; they are pure functions of the
/// quote stream plus whatever private state they accumulate across calls.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn on_quote(&mut self, quote: &Quote, history: &QuoteHistory) -> Option<Signal>;
}
