use std::collections::{BTreeMap, VecDeque};

use qte_execution::{BrokerPosition, Candle, Margins};
use qte_schemas::{BrokerOrderStatus, Order, OrderUpdate, Quote};

/// One order as tracked by the paper broker: the original request plus
/// whatever the broker has decided about it since.
#[derive(Clone, Debug)]
pub struct OrderRecord {
    pub order: Order,
    pub broker_order_id: String,
    pub status: BrokerOrderStatus,
    pub filled_quantity: u64,
    pub average_price: rust_decimal::Decimal,
}

/// All broker-side state, kept behind one lock so every call observes a
/// consistent snapshot. No background tasks, no matching engine, no clock —
/// state changes only in response to an explicit call.
#[derive(Default)]
pub struct Book {
    pub orders: BTreeMap<String, OrderRecord>,
    pub positions: BTreeMap<String, BrokerPosition>,
    pub margins: Margins,
    pub quotes: BTreeMap<String, Quote>,
    pub candles: BTreeMap<String, Vec<Candle>>,
    pub pending_updates: VecDeque<OrderUpdate>,
}
