use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::signal::Action;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

/// Intraday (MIS) vs carry-forward (CIS) product type (GLOSSARY).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Product {
    Mis,
    Cis,
}

/// An order submitted (or about to be submitted) to the broker.
///
/// `metadata` carries the bypass/exit-tagging flags the order manager
/// inspects before gating: `bypass_all_checks`, `closing_action`,
/// `management_action`, `is_exit`, `exit_reason`, plus a `tag` field used for
/// substring matching (`EMERGENCY`, `EXIT`, `FULL_EXIT`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: String,
    pub symbol: String,
    pub action: Action,
    pub quantity: u64,
    pub order_type: OrderType,
    pub product: Product,
    pub price: Option<Decimal>,
    pub tag: Option<String>,
    pub strategy: String,
    pub signal_type: Option<String>,
    pub exit_reason: Option<String>,
    pub metadata: BTreeMap<String, Value>,
}

impl Order {
    pub fn new(
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        action: Action,
        quantity: u64,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: symbol.into(),
            action,
            quantity,
            order_type: OrderType::Market,
            product: Product::Mis,
            price: None,
            tag: None,
            strategy: strategy.into(),
            signal_type: None,
            exit_reason: None,
            metadata: BTreeMap::new(),
        }
    }

    fn meta_bool(&self, key: &str) -> bool {
        self.metadata.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn bypasses_all_checks(&self) -> bool {
        self.meta_bool("bypass_all_checks")
            || self.tag.as_deref().is_some_and(|t| t.contains("EMERGENCY"))
            || self.meta_bool("closing_action")
    }

    /// True if this order is an exit under any of the recognized alternatives.
    pub fn is_exit(&self) -> bool {
        self.meta_bool("is_exit")
            || self.signal_type.as_deref() == Some("EXIT")
            || self
                .tag
                .as_deref()
                .is_some_and(|t| t.contains("EXIT") || t.contains("FULL_EXIT"))
            || self.exit_reason.is_some()
    }

    pub fn is_management_or_closing(&self) -> bool {
        self.meta_bool("management_action") || self.meta_bool("closing_action")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrokerOrderStatus {
    Open,
    Complete,
    Cancelled,
    Rejected,
}

/// A push update from the broker's order-update stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: String,
    pub status: BrokerOrderStatus,
    pub filled_quantity: u64,
    pub pending_quantity: u64,
    pub average_price: Decimal,
    pub ts: DateTime<Utc>,
}
