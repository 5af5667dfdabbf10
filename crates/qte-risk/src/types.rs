use chrono::{DateTime, Utc};

/// Capital and exposure limits, expressed as fractions of total capital
/// except where noted. Defaults mirror the production system this control
/// plane is modeled on.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Fraction of capital a single position's loss may reach before the
    /// trade is rejected outright.
    pub max_single_position_loss_pct: f64,
    /// The single-position-loss fraction above is scaled up by this factor
    /// before being compared against a proposed position's value, because
    /// equity margin is only ~25% of notional: 0.995 / 0.03 rounds to 34.
    pub single_position_margin_multiplier: f64,
    /// Fraction of capital the day's realized+unrealized loss may reach.
    pub max_daily_loss_pct: f64,
    /// Fraction of peak capital drawdown may reach.
    pub max_drawdown_pct: f64,
    /// Fraction of capital a single symbol's exposure may reach.
    pub max_concentration_pct: f64,
    /// Max allowed pairwise return correlation between a new symbol and any
    /// symbol already held.
    pub max_correlation: f64,
    /// Fraction of capital portfolio VaR may reach.
    pub max_var_pct: f64,
    /// Margin fraction of notional for equities (options post full margin).
    pub equity_margin_fraction: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_single_position_loss_pct: 0.03,
            single_position_margin_multiplier: 34.0,
            max_daily_loss_pct: 0.02,
            max_drawdown_pct: 0.05,
            max_concentration_pct: 0.95,
            max_correlation: 0.7,
            max_var_pct: 0.03,
            equity_margin_fraction: 0.25,
        }
    }
}

/// A currently-held position, as far as the risk engine needs to know.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskPosition {
    pub symbol: String,
    pub quantity: u64,
    pub current_price: f64,
    pub is_option: bool,
}

impl RiskPosition {
    pub fn exposure(&self, equity_margin_fraction: f64) -> f64 {
        let notional = self.current_price * self.quantity as f64;
        if self.is_option {
            notional
        } else {
            notional * equity_margin_fraction
        }
    }
}

/// Why a proposed trade was rejected, in the order the checks run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskRejection {
    SinglePositionLoss,
    DailyLossLimit,
    Drawdown,
    Concentration,
    Correlation,
    ValueAtRisk,
    EmergencyStop,
}

/// Outcome of [`crate::RiskManager::validate_trade_risk`].
///
/// `Shrink` is distinct from `Reject`: the concentration check doesn't kill
/// the trade, it proposes the largest quantity that fits instead.
#[derive(Clone, Debug, PartialEq)]
pub enum RiskDecision {
    Approved,
    Shrink { max_quantity: u64 },
    Rejected(RiskRejection),
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertSeverity {
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RiskAlert {
    pub severity: AlertSeverity,
    pub code: &'static str,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Snapshot returned by [`crate::RiskManager::monitor_portfolio_risk`].
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioRiskSnapshot {
    pub daily_pnl: f64,
    pub current_drawdown: f64,
    pub portfolio_var: f64,
    pub portfolio_cvar: f64,
    pub alerts: Vec<RiskAlert>,
}
