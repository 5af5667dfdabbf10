use qte_schemas::{Action, Signal};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedOrder {
    pub user_id: String,
    pub symbol: String,
    pub action: Action,
    pub quantity: u64,
    pub entry_price: Decimal,
}

impl AllocatedOrder {
    pub fn from_signal(signal: &Signal, user_id: impl Into<String>, quantity: u64) -> Self {
        Self {
            user_id: user_id.into(),
            symbol: signal.symbol.clone(),
            action: signal.action,
            quantity,
            entry_price: signal.entry_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllocationError {
    NoEligibleUsers,
    LowPerformingStrategy { weight: f64 },
    NoMarginAvailable,
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::NoEligibleUsers => write!(f, "no eligible users for trade allocation"),
            AllocationError::LowPerformingStrategy { weight } => {
                write!(f, "strategy weight {weight:.2} below allocation floor")
            }
            AllocationError::NoMarginAvailable => write!(f, "no eligible user has sufficient margin"),
        }
    }
}

impl std::error::Error for AllocationError {}
