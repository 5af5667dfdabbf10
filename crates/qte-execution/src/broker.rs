//! The external broker boundary. Every live or paper broker integration
//! implements [`BrokerAdapter`]; nothing above this trait knows whether it is
//! talking to Zerodha, a sandbox, or an in-memory simulator.

use std::collections::BTreeMap;

use async_trait::async_trait;
use qte_schemas::{Order, OrderUpdate, Quote};

use crate::types::{Candle, Margins, PositionBook};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    RejectedByBroker(String),
    NotFound,
    Unavailable(String),
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::RejectedByBroker(reason) => write!(f, "broker rejected order: {reason}"),
            BrokerError::NotFound => write!(f, "broker order not found"),
            BrokerError::Unavailable(reason) => write!(f, "broker unavailable: {reason}"),
        }
    }
}

impl std::error::Error for BrokerError {}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// The broker-agnostic surface the control plane is built against.
///
/// Mirrors the external interface exactly: margins, positions, batched
/// quotes, historical candles, and order placement/cancellation. Order
/// updates are delivered separately via [`poll_order_updates`], since they
/// are a push stream rather than a request/response call.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn get_margins(&self) -> BrokerResult<Margins>;

    async fn get_positions(&self) -> BrokerResult<PositionBook>;

    /// Batched quote lookup keyed by `exchange:symbol`.
    async fn get_quote(&self, symbols: &[String]) -> BrokerResult<BTreeMap<String, Quote>>;

    async fn get_historical_data(
        &self,
        symbol: &str,
        interval: &str,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> BrokerResult<Vec<Candle>>;

    /// Submit a new order. Returns the broker-assigned order id.
    async fn place_order(&self, order: &Order) -> BrokerResult<String>;

    async fn cancel_order(&self, order_id: &str) -> BrokerResult<()>;

    /// Drain whatever order updates the adapter has buffered since the last
    /// call. Implementations that hold a genuine push stream forward it here;
    /// a poll-based adapter (e.g. paper trading) can synthesize updates on
    /// each call instead.
    async fn poll_order_updates(&self) -> BrokerResult<Vec<OrderUpdate>>;
}
