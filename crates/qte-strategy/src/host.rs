use qte_schemas::{Quote, Signal};

use crate::{QuoteHistory, Strategy};

/// Owns the registered strategies and the shared quote history, and fans
/// each incoming quote out to every strategy, collecting candidate signals.
///
/// This is the "strategy pool" leaf referenced by the broader system design:
/// strategy generation itself is treated as exogenous input to the control
/// plane, but something has to own the fan-out and the shared rolling
/// window so strategies don't each keep their own copy of quote history.
pub struct StrategyPool {
    strategies: Vec<Box<dyn Strategy>>,
    history: QuoteHistory,
}

impl StrategyPool {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            strategies: Vec::new(),
            history: QuoteHistory::new(history_capacity),
        }
    }

    pub fn register(&mut self, strategy: Box<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Pushes `quote` into the shared history, then runs every registered
    /// strategy against it, collecting whatever signals they emit.
    pub fn on_quote(&mut self, quote: &Quote) -> Vec<Signal> {
        self.history.push(quote);
        self.strategies
            .iter_mut()
            .filter_map(|s| s.on_quote(quote, &self.history))
            .collect()
    }
}

impl Default for StrategyPool {
    fn default() -> Self {
        Self::new(50)
    }
}
