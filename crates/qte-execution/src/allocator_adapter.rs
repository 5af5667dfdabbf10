//! Wires [`qte_allocator::TradeAllocator`] into the [`SignalAllocator`] seam
//! `OrderManager` is built against, so the order manager never depends on
//! the allocation pipeline directly.

use chrono::{DateTime, Utc};
use qte_allocator::TradeAllocator;
use qte_schemas::Signal;

use crate::order_manager::SignalAllocator;

impl SignalAllocator for TradeAllocator {
    fn allocate(&mut self, strategy_name: &str, signal: &Signal, now: DateTime<Utc>) -> Vec<(String, u64)> {
        self.allocate_with_fallback(strategy_name, signal, now)
            .into_iter()
            .map(|order| (order.user_id, order.quantity))
            .collect()
    }
}
