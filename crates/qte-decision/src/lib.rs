//! qte-decision — the position-opening gate.
//!
//! `PositionOpeningDecision::evaluate` runs every signal through a fixed
//! sequence of checks before a single order is ever placed. Each check maps
//! to one reason code; the first one that fails is the rejection reason,
//! so a caller only ever needs to handle one cause at a time. Structural
//! risk and duplicate-detection checks are delegated to `qte-risk` and
//! `qte-dedup` rather than re-implemented here.

use chrono::{DateTime, Utc};
use qte_dedup::{DedupRejection, DedupResult};
use qte_risk::{RiskDecision, RiskRejection};
use qte_schemas::{Action, MarketBias, Signal};
use rust_decimal::prelude::ToPrimitive;

/// Floor below which a signal is never worth evaluating further, regardless
/// of bias/timing/capital — the same floor `MarketBias::should_allow_signal`
/// uses for a neutral market.
const MIN_RAW_CONFIDENCE: f64 = 5.5;
/// Minimum combined confidence (raw + bias/momentum boosts) required to
/// actually open a position.
const MIN_FINAL_CONFIDENCE: f64 = 7.0;
const MAX_CONFIDENCE: f64 = 10.0;
const STRONG_BIAS_CONFIDENCE: f64 = 7.0;
const STRONG_BIAS_BOOST: f64 = 0.5;
const NIFTY_MOVE_THRESHOLD_PCT: f64 = 1.0;
const NIFTY_MOVE_BOOST: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Confidence,
    Bias,
    Risk,
    Timing,
    Capital,
    Duplicate,
    MarketConditions,
    Enhancement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub position_size: u64,
    pub risk_score: f64,
    pub final_confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionResult {
    Approved(Approval),
    Rejected { reason: DecisionReason, detail: String },
}

impl DecisionResult {
    pub fn is_approved(&self) -> bool {
        matches!(self, DecisionResult::Approved(_))
    }
}

/// Everything `evaluate` needs about the world at the moment a signal
/// arrives. Assembled by the caller from the position tracker, bias
/// engine, risk manager, and dedup check — this crate doesn't hold any of
/// that state itself.
pub struct DecisionContext {
    pub bias: MarketBias,
    pub risk_decision: RiskDecision,
    pub dedup_result: DedupResult,
    pub trading_hours_ok: bool,
    pub market_conditions_ok: bool,
    pub available_capital: f64,
    pub total_capital: f64,
    pub now: DateTime<Utc>,
}

pub struct PositionOpeningDecision;

impl PositionOpeningDecision {
    pub fn evaluate(signal: &Signal, nifty_change_pct: f64, ctx: &DecisionContext) -> DecisionResult {
        let mut reasoning = Vec::new();

        if signal.confidence < MIN_RAW_CONFIDENCE {
            return DecisionResult::Rejected {
                reason: DecisionReason::Confidence,
                detail: format!(
                    "raw confidence {:.2} below floor {:.2}",
                    signal.confidence, MIN_RAW_CONFIDENCE
                ),
            };
        }
        reasoning.push(format!("raw confidence {:.2} clears floor", signal.confidence));

        if !ctx.bias.should_allow_signal(signal.action, signal.confidence) {
            return DecisionResult::Rejected {
                reason: DecisionReason::Bias,
                detail: format!(
                    "bias {:?} (confidence {:.2}) does not clear signal for {:?}",
                    ctx.bias.direction, ctx.bias.confidence, signal.action
                ),
            };
        }
        reasoning.push(format!("bias {:?} allows {:?}", ctx.bias.direction, signal.action));

        if !ctx.trading_hours_ok {
            return DecisionResult::Rejected {
                reason: DecisionReason::Timing,
                detail: "outside NSE/NFO trading hours".to_string(),
            };
        }

        if !ctx.market_conditions_ok {
            return DecisionResult::Rejected {
                reason: DecisionReason::MarketConditions,
                detail: "market regime unsuitable for new entries".to_string(),
            };
        }

        match ctx.dedup_result {
            DedupResult::Reject(DedupRejection::PositionExists) => {
                return DecisionResult::Rejected {
                    reason: DecisionReason::Duplicate,
                    detail: format!("position already open on {}", signal.symbol),
                };
            }
            DedupResult::Reject(DedupRejection::DuplicateFingerprint) => {
                return DecisionResult::Rejected {
                    reason: DecisionReason::Duplicate,
                    detail: "identical signal accepted within the last 5 minutes".to_string(),
                };
            }
            DedupResult::Reject(DedupRejection::PostExitCooldown) => {
                return DecisionResult::Rejected {
                    reason: DecisionReason::Duplicate,
                    detail: format!("{} is inside its post-exit cooldown", signal.symbol),
                };
            }
            DedupResult::Accept => {}
        }

        let approved_quantity = match ctx.risk_decision {
            RiskDecision::Rejected(rejection) => {
                return DecisionResult::Rejected {
                    reason: DecisionReason::Risk,
                    detail: format!("{rejection:?}"),
                };
            }
            RiskDecision::Shrink { max_quantity } => {
                reasoning.push(format!(
                    "concentration limit shrank quantity from {} to {}",
                    signal.quantity, max_quantity
                ));
                max_quantity
            }
            RiskDecision::Approved => signal.quantity,
        };

        let entry_price = signal.entry_price.to_f64().unwrap_or_default();
        let notional = entry_price * approved_quantity as f64;
        if notional > ctx.available_capital {
            return DecisionResult::Rejected {
                reason: DecisionReason::Capital,
                detail: format!(
                    "position notional {notional:.2} exceeds available capital {:.2}",
                    ctx.available_capital
                ),
            };
        }

        let size_multiplier = ctx.bias.position_size_multiplier(signal.action);
        let position_size = ((approved_quantity as f64) * size_multiplier).floor().max(0.0) as u64;
        let position_size = position_size.max(1).min(approved_quantity.max(1));

        let bias_aligned = matches!(
            (ctx.bias.direction, signal.action),
            (qte_schemas::BiasDirection::Bullish, Action::Buy)
                | (qte_schemas::BiasDirection::Bearish, Action::Sell)
        );
        let mut final_confidence = signal.confidence;
        if ctx.bias.confidence >= STRONG_BIAS_CONFIDENCE && bias_aligned {
            final_confidence += STRONG_BIAS_BOOST;
            reasoning.push("strong aligned bias boost applied".to_string());
        }
        if nifty_change_pct.abs() > NIFTY_MOVE_THRESHOLD_PCT {
            final_confidence += NIFTY_MOVE_BOOST;
            reasoning.push("NIFTY momentum boost applied".to_string());
        }
        final_confidence = final_confidence.min(MAX_CONFIDENCE);

        if final_confidence < MIN_FINAL_CONFIDENCE {
            return DecisionResult::Rejected {
                reason: DecisionReason::Confidence,
                detail: format!(
                    "final confidence {final_confidence:.2} below required {MIN_FINAL_CONFIDENCE:.2}"
                ),
            };
        }

        let risk_score = if ctx.total_capital > 0.0 {
            (notional / ctx.total_capital) * 100.0
        } else {
            0.0
        };

        tracing::info!(
            symbol = %signal.symbol,
            strategy = %signal.strategy_name,
            position_size,
            final_confidence,
            "position opening approved"
        );

        DecisionResult::Approved(Approval {
            position_size,
            risk_score,
            final_confidence,
            reasoning,
        })
    }
}
