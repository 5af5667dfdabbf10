//! Deterministic in-memory "paper" broker adapter.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `broker_order_id` is `"paper-{n}"`, assigned by an in-process counter.
//! - Orders are accepted immediately; there is no matching engine and no
//!   latency simulation.
//! - Fills are not auto-generated. Call [`PaperBroker::fill_order`]
//!   explicitly to simulate one, the same way a test drives any other
//!   broker event.
//! - Quotes, candles, margins and starting positions are whatever the
//!   caller seeds via [`PaperBroker::set_quote`] / [`PaperBroker::set_candles`]
//!   / [`PaperBroker::set_margins`] / [`PaperBroker::set_position`] — this
//!   broker has no market data of its own.
//!
//! Implements [`qte_execution::BrokerAdapter`] so it can stand in for a live
//! broker in end-to-end control-plane tests and local runs.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qte_execution::{BrokerAdapter, BrokerError, BrokerPosition, BrokerResult, Candle, Margins, PositionBook};
use qte_schemas::{Action, BrokerOrderStatus, Order, OrderUpdate, Quote};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

pub mod types;

use types::{Book, OrderRecord};

#[derive(Default)]
pub struct PaperBroker {
    book: Mutex<Book>,
    next_id: AtomicU64,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_order_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("paper-{n}")
    }

    /// Seed the margin snapshot [`BrokerAdapter::get_margins`] returns.
    pub async fn set_margins(&self, margins: Margins) {
        self.book.lock().await.margins = margins;
    }

    /// Seed (or overwrite) a starting position, for test setup.
    pub async fn set_position(&self, position: BrokerPosition) {
        self.book.lock().await.positions.insert(position.tradingsymbol.clone(), position);
    }

    /// Seed the quote [`BrokerAdapter::get_quote`] returns for `symbol`.
    pub async fn set_quote(&self, quote: Quote) {
        self.book.lock().await.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Seed the candle series [`BrokerAdapter::get_historical_data`] returns for `symbol`.
    pub async fn set_candles(&self, symbol: impl Into<String>, candles: Vec<Candle>) {
        self.book.lock().await.candles.insert(symbol.into(), candles);
    }

    /// Explicitly simulate a fill (partial or full) on a previously placed
    /// order. No-op if `broker_order_id` is unknown or already terminal.
    pub async fn fill_order(&self, broker_order_id: &str, fill_qty: u64, fill_price: Decimal, now: DateTime<Utc>) {
        let mut book = self.book.lock().await;
        let Some(record) = book.orders.get_mut(broker_order_id) else {
            tracing::warn!(broker_order_id, "fill requested for unknown order");
            return;
        };
        if matches!(record.status, BrokerOrderStatus::Complete | BrokerOrderStatus::Cancelled | BrokerOrderStatus::Rejected) {
            return;
        }

        let total_qty = record.order.quantity;
        record.filled_quantity = (record.filled_quantity + fill_qty).min(total_qty);
        record.average_price = fill_price;
        let pending = total_qty - record.filled_quantity;
        record.status = if pending == 0 { BrokerOrderStatus::Complete } else { BrokerOrderStatus::Open };

        let symbol = record.order.symbol.clone();
        let status = record.status;
        let filled_quantity = record.filled_quantity;
        let signed_delta = match record.order.action {
            Action::Buy => fill_qty as i64,
            Action::Sell => -(fill_qty as i64),
        };

        book.pending_updates.push_back(OrderUpdate {
            order_id: broker_order_id.to_string(),
            status,
            filled_quantity,
            pending_quantity: pending,
            average_price: fill_price,
            ts: now,
        });

        let position = book.positions.entry(symbol.clone()).or_insert_with(|| BrokerPosition {
            tradingsymbol: symbol,
            quantity: 0,
            average_price: fill_price,
            last_price: fill_price,
        });
        position.quantity += signed_delta;
        position.last_price = fill_price;
    }
}

#[async_trait]
impl BrokerAdapter for PaperBroker {
    async fn get_margins(&self) -> BrokerResult<Margins> {
        Ok(self.book.lock().await.margins.clone())
    }

    async fn get_positions(&self) -> BrokerResult<PositionBook> {
        let book = self.book.lock().await;
        Ok(PositionBook {
            net: book.positions.values().cloned().collect(),
            day: book.positions.values().cloned().collect(),
        })
    }

    async fn get_quote(&self, symbols: &[String]) -> BrokerResult<BTreeMap<String, Quote>> {
        let book = self.book.lock().await;
        Ok(symbols
            .iter()
            .filter_map(|s| book.quotes.get(s).map(|q| (s.clone(), q.clone())))
            .collect())
    }

    async fn get_historical_data(
        &self,
        symbol: &str,
        _interval: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> BrokerResult<Vec<Candle>> {
        Ok(self.book.lock().await.candles.get(symbol).cloned().unwrap_or_default())
    }

    async fn place_order(&self, order: &Order) -> BrokerResult<String> {
        let mut book = self.book.lock().await;
        let broker_order_id = self.next_order_id();
        let record = OrderRecord {
            order: order.clone(),
            broker_order_id: broker_order_id.clone(),
            status: BrokerOrderStatus::Open,
            filled_quantity: 0,
            average_price: order.price.unwrap_or(Decimal::ZERO),
        };
        book.pending_updates.push_back(OrderUpdate {
            order_id: broker_order_id.clone(),
            status: BrokerOrderStatus::Open,
            filled_quantity: 0,
            pending_quantity: order.quantity,
            average_price: record.average_price,
            ts: Utc::now(),
        });
        book.orders.insert(broker_order_id.clone(), record);
        Ok(broker_order_id)
    }

    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()> {
        let mut book = self.book.lock().await;
        let Some(record) = book.orders.get_mut(order_id) else {
            return Err(BrokerError::NotFound);
        };
        if matches!(record.status, BrokerOrderStatus::Complete | BrokerOrderStatus::Cancelled | BrokerOrderStatus::Rejected) {
            return Err(BrokerError::RejectedByBroker("order already terminal".to_string()));
        }
        record.status = BrokerOrderStatus::Cancelled;
        let pending = record.order.quantity - record.filled_quantity;
        let average_price = record.average_price;
        let filled = record.filled_quantity;
        book.pending_updates.push_back(OrderUpdate {
            order_id: order_id.to_string(),
            status: BrokerOrderStatus::Cancelled,
            filled_quantity: filled,
            pending_quantity: pending,
            average_price,
            ts: Utc::now(),
        });
        Ok(())
    }

    async fn poll_order_updates(&self) -> BrokerResult<Vec<OrderUpdate>> {
        let mut book = self.book.lock().await;
        Ok(book.pending_updates.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qte_schemas::Action;

    fn order(symbol: &str, action: Action, qty: u64) -> Order {
        Order::new("user-1", symbol, action, qty, "momentum_breakout")
    }

    #[tokio::test]
    async fn place_order_assigns_incrementing_ids() {
        let broker = PaperBroker::new();
        let a = broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        let b = broker.place_order(&order("TCS", Action::Buy, 5)).await.unwrap();
        assert_eq!(a, "paper-0");
        assert_eq!(b, "paper-1");
    }

    #[tokio::test]
    async fn place_order_emits_an_open_update() {
        let broker = PaperBroker::new();
        broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        let updates = broker.poll_order_updates().await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, BrokerOrderStatus::Open);
        assert_eq!(updates[0].pending_quantity, 10);
    }

    #[tokio::test]
    async fn poll_drains_updates_so_a_second_poll_is_empty() {
        let broker = PaperBroker::new();
        broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        broker.poll_order_updates().await.unwrap();
        let second = broker.poll_order_updates().await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn cancel_unknown_order_is_not_found() {
        let broker = PaperBroker::new();
        let err = broker.cancel_order("nope").await.unwrap_err();
        assert_eq!(err, BrokerError::NotFound);
    }

    #[tokio::test]
    async fn cancel_live_order_marks_it_cancelled() {
        let broker = PaperBroker::new();
        let id = broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        broker.poll_order_updates().await.unwrap();
        broker.cancel_order(&id).await.unwrap();
        let updates = broker.poll_order_updates().await.unwrap();
        assert_eq!(updates[0].status, BrokerOrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn fill_updates_position_quantity() {
        let broker = PaperBroker::new();
        let id = broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        broker.fill_order(&id, 10, Decimal::from(2500), Utc::now()).await;
        let positions = broker.get_positions().await.unwrap();
        assert_eq!(positions.net.len(), 1);
        assert_eq!(positions.net[0].quantity, 10);
    }

    #[tokio::test]
    async fn partial_fill_leaves_order_open() {
        let broker = PaperBroker::new();
        let id = broker.place_order(&order("RELIANCE", Action::Buy, 10)).await.unwrap();
        broker.fill_order(&id, 4, Decimal::from(2500), Utc::now()).await;
        let updates = broker.poll_order_updates().await.unwrap();
        let fill_update = updates.iter().find(|u| u.order_id == id).unwrap();
        assert_eq!(fill_update.status, BrokerOrderStatus::Open);
        assert_eq!(fill_update.pending_quantity, 6);
    }

    #[tokio::test]
    async fn sell_fill_reduces_position_quantity() {
        let broker = PaperBroker::new();
        broker
            .set_position(BrokerPosition {
                tradingsymbol: "RELIANCE".to_string(),
                quantity: 10,
                average_price: Decimal::from(2500),
                last_price: Decimal::from(2500),
            })
            .await;
        let id = broker.place_order(&order("RELIANCE", Action::Sell, 10)).await.unwrap();
        broker.fill_order(&id, 10, Decimal::from(2550), Utc::now()).await;
        let positions = broker.get_positions().await.unwrap();
        assert_eq!(positions.net[0].quantity, 0);
    }

    #[tokio::test]
    async fn seeded_quote_is_returned_for_requested_symbols() {
        let broker = PaperBroker::new();
        broker
            .set_quote(Quote {
                symbol: "RELIANCE".to_string(),
                ltp: Decimal::from(2500),
                open: Decimal::from(2480),
                high: Decimal::from(2510),
                low: Decimal::from(2470),
                prev_close: Decimal::from(2490),
                volume: 1_000_000,
                vwap: Decimal::from(2495),
                change_percent: None,
                timestamp: Utc::now(),
            })
            .await;
        let quotes = broker.get_quote(&["RELIANCE".to_string(), "TCS".to_string()]).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert!(quotes.contains_key("RELIANCE"));
    }
}
