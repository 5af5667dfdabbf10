//! qte-risk — portfolio risk book: trade-level gating, drawdown/VaR
//! monitoring, correlation tracking, and the emergency stop latch.
//!
//! `RiskManager` holds the mutable risk state; `validate_trade_risk` is a
//! pure read over that state plus a proposed trade, returning a typed
//! decision rather than throwing. `monitor_portfolio_risk` is the only
//! method that mutates state on a timer rather than in response to a
//! specific trade.

mod correlation;
mod engine;
mod types;
mod var;

pub use correlation::CorrelationTracker;
pub use engine::{RiskManager, TradeRiskRequest};
pub use types::{
    AlertSeverity, PortfolioRiskSnapshot, RiskAlert, RiskDecision, RiskLimits, RiskPosition,
    RiskRejection,
};
pub use var::ValueAtRiskCalculator;
