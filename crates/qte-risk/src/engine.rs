use chrono::{DateTime, NaiveTime, Timelike, Utc};

use crate::correlation::CorrelationTracker;
use crate::types::{AlertSeverity, PortfolioRiskSnapshot, RiskAlert, RiskDecision, RiskLimits, RiskPosition, RiskRejection};
use crate::var::ValueAtRiskCalculator;

const WARNING_FRACTION: f64 = 0.8;
const MARKET_OPEN: NaiveTime = NaiveTime::from_hms_opt(9, 15, 0).unwrap();
const MARKET_CLOSE: NaiveTime = NaiveTime::from_hms_opt(15, 30, 0).unwrap();

/// Everything needed to evaluate one proposed trade against the risk book.
pub struct TradeRiskRequest {
    pub symbol: String,
    pub quantity: u64,
    pub price_per_share: f64,
    pub is_option: bool,
    pub total_capital: f64,
    pub held_positions: Vec<RiskPosition>,
}

impl TradeRiskRequest {
    fn notional(&self) -> f64 {
        self.price_per_share * self.quantity as f64
    }
}

/// Portfolio-level risk book: daily P&L, drawdown, VaR, correlation, and the
/// emergency stop latch. `validate_trade_risk` runs the ordered checks a
/// proposed trade must clear; `monitor_portfolio_risk` is the periodic
/// housekeeping pass that recomputes drawdown/VaR and raises alerts.
pub struct RiskManager {
    limits: RiskLimits,
    var_calc: ValueAtRiskCalculator,
    correlation: CorrelationTracker,
    peak_capital: f64,
    current_drawdown: f64,
    daily_pnl: f64,
    /// Realized P&L booked today, accumulated as positions close rather than
    /// re-derived from the open book: a closed position leaves the tracker
    /// entirely, so summing the open book each tick silently drops it.
    daily_realized_pnl: f64,
    portfolio_var: f64,
    emergency_stop_triggered: bool,
}

impl RiskManager {
    pub fn new(initial_capital: f64, limits: RiskLimits) -> Self {
        Self {
            limits,
            var_calc: ValueAtRiskCalculator::new(),
            correlation: CorrelationTracker::new(),
            peak_capital: initial_capital,
            current_drawdown: 0.0,
            daily_pnl: 0.0,
            daily_realized_pnl: 0.0,
            portfolio_var: 0.0,
            emergency_stop_triggered: false,
        }
    }

    /// Books realized P&L from a position exit into the day's running
    /// total. Called from exit handlers only (manual close, monitor-driven
    /// close) — never re-derived from the open book.
    pub fn record_realized_pnl(&mut self, amount: f64) {
        self.daily_realized_pnl += amount;
    }

    pub fn daily_realized_pnl(&self) -> f64 {
        self.daily_realized_pnl
    }

    pub fn var_calculator_mut(&mut self) -> &mut ValueAtRiskCalculator {
        &mut self.var_calc
    }

    pub fn correlation_tracker_mut(&mut self) -> &mut CorrelationTracker {
        &mut self.correlation
    }

    pub fn trigger_emergency_stop(&mut self) {
        self.emergency_stop_triggered = true;
        tracing::error!(severity = "critical", "emergency stop triggered");
    }

    pub fn clear_emergency_stop(&mut self) {
        self.emergency_stop_triggered = false;
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stop_triggered
    }

    pub fn current_drawdown(&self) -> f64 {
        self.current_drawdown
    }

    /// Runs the ordered risk checks. Concentration is the one check that
    /// shrinks instead of rejecting outright: a proposal that would exceed
    /// per-symbol exposure gets the largest quantity that still fits,
    /// rather than being killed, as long as some nonzero quantity fits.
    ///
    /// Options bypass every capital cap below (single-position, daily-loss,
    /// drawdown, concentration, correlation, VaR): premium cost doesn't
    /// scale with notional the way equity margin does, so those caps don't
    /// apply. Only the emergency stop still gates an options trade.
    pub fn validate_trade_risk(&self, req: &TradeRiskRequest) -> RiskDecision {
        if req.is_option {
            return if self.emergency_stop_triggered {
                RiskDecision::Rejected(RiskRejection::EmergencyStop)
            } else {
                RiskDecision::Approved
            };
        }

        let notional = req.notional();

        let single_position_limit = req.total_capital
            * self.limits.max_single_position_loss_pct
            * self.limits.single_position_margin_multiplier;
        if notional > single_position_limit {
            return RiskDecision::Rejected(RiskRejection::SinglePositionLoss);
        }

        let daily_loss_limit = req.total_capital * self.limits.max_daily_loss_pct;
        if -self.daily_pnl >= daily_loss_limit {
            return RiskDecision::Rejected(RiskRejection::DailyLossLimit);
        }

        if self.current_drawdown >= self.limits.max_drawdown_pct {
            return RiskDecision::Rejected(RiskRejection::Drawdown);
        }

        let max_concentration = req.total_capital * self.limits.max_concentration_pct;
        let current_exposure: f64 = req
            .held_positions
            .iter()
            .filter(|p| p.symbol == req.symbol)
            .map(|p| p.exposure(self.limits.equity_margin_fraction))
            .sum();
        // Options already returned above; everything past this point is equity-only.
        let margin_per_share = req.price_per_share * self.limits.equity_margin_fraction;
        let prospective_exposure = notional * self.limits.equity_margin_fraction;
        if current_exposure + prospective_exposure > max_concentration {
            let available_room = max_concentration - current_exposure;
            if available_room <= 0.0 || margin_per_share <= 0.0 {
                return RiskDecision::Rejected(RiskRejection::Concentration);
            }
            let max_quantity = ((available_room / margin_per_share).floor() as i64).max(0) as u64;
            let max_quantity = max_quantity.min(req.quantity);
            if max_quantity == 0 {
                return RiskDecision::Rejected(RiskRejection::Concentration);
            }
            return RiskDecision::Shrink { max_quantity };
        }

        let held_symbols: Vec<String> = req.held_positions.iter().map(|p| p.symbol.clone()).collect();
        if let Some(corr) = self.correlation.max_correlation_against(&req.symbol, &held_symbols) {
            if corr > self.limits.max_correlation {
                return RiskDecision::Rejected(RiskRejection::Correlation);
            }
        }

        let var_limit = req.total_capital * self.limits.max_var_pct;
        let estimated_new_var = self.portfolio_var + notional * 0.02;
        if estimated_new_var > var_limit {
            return RiskDecision::Rejected(RiskRejection::ValueAtRisk);
        }

        if self.emergency_stop_triggered {
            return RiskDecision::Rejected(RiskRejection::EmergencyStop);
        }

        RiskDecision::Approved
    }

    /// Whether `now` (in IST) falls inside the NSE/NFO continuous trading
    /// session. Fails closed: anything that can't be parsed as a trading
    /// time is outside hours.
    pub fn validate_trading_hours(&self, now_ist: DateTime<Utc>) -> bool {
        let t = now_ist.time();
        t >= MARKET_OPEN && t < MARKET_CLOSE && now_ist.weekday_is_trading_day()
    }

    /// Periodic housekeeping: recompute drawdown against the running peak,
    /// roll the accumulated daily realized P&L plus current unrealized P&L
    /// into `daily_pnl`, refresh the portfolio VaR estimate, and raise
    /// warning/critical alerts at 80%/100% of each limit.
    pub fn monitor_portfolio_risk(
        &mut self,
        current_capital: f64,
        unrealized_pnl: f64,
        now: DateTime<Utc>,
    ) -> PortfolioRiskSnapshot {
        if current_capital > self.peak_capital {
            self.peak_capital = current_capital;
            self.current_drawdown = 0.0;
        } else if self.peak_capital > 0.0 {
            self.current_drawdown = (self.peak_capital - current_capital) / self.peak_capital;
        }

        self.daily_pnl = self.daily_realized_pnl + unrealized_pnl;

        let (var, cvar) = self.var_calc.calculate_portfolio_var(current_capital, 1.0, 0.95);
        self.portfolio_var = var;

        let mut alerts = Vec::new();

        let daily_loss_limit = current_capital * self.limits.max_daily_loss_pct;
        push_threshold_alerts(
            &mut alerts,
            -self.daily_pnl,
            daily_loss_limit,
            "DAILY_LOSS",
            "daily loss approaching limit",
            "daily loss limit breached",
            now,
        );

        push_threshold_alerts(
            &mut alerts,
            self.current_drawdown,
            self.limits.max_drawdown_pct,
            "DRAWDOWN",
            "drawdown approaching limit",
            "drawdown limit breached",
            now,
        );

        let var_limit = current_capital * self.limits.max_var_pct;
        push_threshold_alerts(
            &mut alerts,
            self.portfolio_var,
            var_limit,
            "VAR_LIMIT",
            "portfolio VaR approaching limit",
            "portfolio VaR limit breached",
            now,
        );

        for alert in &alerts {
            if alert.severity == AlertSeverity::Critical {
                tracing::error!(severity = "critical", code = alert.code, "{}", alert.message);
            } else {
                tracing::warn!(code = alert.code, "{}", alert.message);
            }
        }

        PortfolioRiskSnapshot {
            daily_pnl: self.daily_pnl,
            current_drawdown: self.current_drawdown,
            portfolio_var: self.portfolio_var,
            portfolio_cvar: cvar,
            alerts,
        }
    }
}

fn push_threshold_alerts(
    alerts: &mut Vec<RiskAlert>,
    value: f64,
    limit: f64,
    code: &'static str,
    warning_message: &str,
    critical_message: &str,
    now: DateTime<Utc>,
) {
    if limit <= 0.0 {
        return;
    }
    if value >= limit {
        alerts.push(RiskAlert {
            severity: AlertSeverity::Critical,
            code,
            message: critical_message.to_string(),
            raised_at: now,
        });
    } else if value >= limit * WARNING_FRACTION {
        alerts.push(RiskAlert {
            severity: AlertSeverity::Warning,
            code,
            message: warning_message.to_string(),
            raised_at: now,
        });
    }
}

trait TradingDay {
    fn weekday_is_trading_day(&self) -> bool;
}

impl TradingDay for DateTime<Utc> {
    fn weekday_is_trading_day(&self) -> bool {
        use chrono::Datelike;
        !matches!(self.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
    }
}
