//! Per-position exit evaluation — pure functions of a position and the
//! clock/risk state, independent of broker or network access.
//!
//! [`evaluate_exit`] runs the checks in strict order and returns on the
//! first match: time-based, scalp timeout, stop-loss (with trailing
//! lock-in), target (with partial booking), trailing stop, risk-based.
//! Checks before the match may still mutate the position (tightening a
//! stop-loss, advancing a trailing stop) even when they don't themselves
//! trigger an exit.

use chrono::{DateTime, NaiveTime, Utc};
use qte_schemas::{ExitCondition, ExitKind, ExitPriority, Position, Side};
use rust_decimal::Decimal;

const MARKET_CLOSE_EMERGENCY: NaiveTime = NaiveTime::from_hms_opt(15, 30, 0).unwrap();
const MANDATORY_CLOSE: NaiveTime = NaiveTime::from_hms_opt(15, 20, 0).unwrap();
const SQUARE_OFF_WINDOW: NaiveTime = NaiveTime::from_hms_opt(15, 15, 0).unwrap();

const SCALP_MIN_PNL_PCT: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1
const STOP_LOSS_TRIGGER_PNL_PCT: Decimal = Decimal::from_parts(2, 0, 0, false, 0); // 2
const STOP_LOSS_LOCK_IN_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 1); // 0.5
const TARGET_TIGHTEN_FRACTION: Decimal = Decimal::from_parts(3, 0, 0, false, 1); // 0.3
const TRAILING_ARM_PNL_PCT: Decimal = Decimal::from_parts(1, 0, 0, false, 0); // 1
const TRAILING_TRAIL_FRACTION: Decimal = Decimal::from_parts(4, 0, 0, false, 1); // 0.4
const TRAILING_MIN_PROFIT_LOCK: Decimal = Decimal::from_parts(101, 0, 0, false, 2); // 1.01

/// Context an evaluation pass needs beyond the position itself.
pub struct ExitContext {
    pub now: DateTime<Utc>,
    pub is_option: bool,
    pub risk_emergency_stop: bool,
    pub daily_loss_breached: bool,
}

/// What a matched exit condition asks the caller to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    /// Close the whole position.
    Full(ExitCondition),
    /// Book `quantity` now; the remainder stays open.
    Partial { condition: ExitCondition, quantity: u64 },
}

impl ExitAction {
    pub fn condition(&self) -> &ExitCondition {
        match self {
            ExitAction::Full(c) => c,
            ExitAction::Partial { condition, .. } => condition,
        }
    }
}

pub fn evaluate_exit(position: &mut Position, ctx: &ExitContext) -> Option<ExitAction> {
    if let Some(action) = time_based(position, ctx.now) {
        return Some(action);
    }
    if let Some(action) = scalp_timeout(position, ctx.now) {
        return Some(action);
    }
    if let Some(action) = stop_loss_with_trailing(position) {
        return Some(action);
    }
    if let Some(action) = target_with_partial_booking(position, ctx.is_option) {
        return Some(action);
    }
    if let Some(action) = trailing_stop(position) {
        return Some(action);
    }
    if let Some(action) = risk_based(position, ctx) {
        return Some(action);
    }
    None
}

fn time_based(position: &Position, now: DateTime<Utc>) -> Option<ExitAction> {
    let t = now.time();
    let (priority, reason) = if t >= MARKET_CLOSE_EMERGENCY {
        tracing::error!(symbol = %position.symbol, "market close emergency exit: position still open at 15:30");
        (ExitPriority::Emergency, "market close emergency")
    } else if t >= MANDATORY_CLOSE {
        (ExitPriority::Mandatory, "mandatory close")
    } else if t >= SQUARE_OFF_WINDOW {
        (ExitPriority::StopOrTrailOrScalp, "intraday square-off window")
    } else {
        return None;
    };
    Some(ExitAction::Full(
        ExitCondition::new(position.symbol.clone(), ExitKind::TimeBased, priority, reason)
            .with_trigger_price(position.current_price),
    ))
}

fn scalp_timeout(position: &Position, now: DateTime<Utc>) -> Option<ExitAction> {
    let hybrid_mode = position.metadata.get("hybrid_mode").and_then(|v| v.as_str());
    if hybrid_mode != Some("SCALP") {
        return None;
    }
    let max_hold_minutes = position.metadata.get("max_hold_minutes").and_then(|v| v.as_i64())?;
    if max_hold_minutes <= 0 {
        return None;
    }
    let held = position.minutes_held(now);
    let pnl_pct = position.pnl_pct();

    let reason = if held >= max_hold_minutes && pnl_pct >= SCALP_MIN_PNL_PCT {
        "scalp timeout, in profit"
    } else if held >= 2 * max_hold_minutes {
        "scalp timeout, forced exit at loss"
    } else {
        return None;
    };

    Some(ExitAction::Full(
        ExitCondition::new(position.symbol.clone(), ExitKind::ScalpTimeout, ExitPriority::StopOrTrailOrScalp, reason)
            .with_trigger_price(position.current_price),
    ))
}

fn favorable_move(position: &Position) -> Decimal {
    match position.side {
        Side::Long => position.current_price - position.average_price,
        Side::Short => position.average_price - position.current_price,
    }
}

fn stop_loss_with_trailing(position: &mut Position) -> Option<ExitAction> {
    if position.pnl_pct() >= STOP_LOSS_TRIGGER_PNL_PCT {
        let lock_in = favorable_move(position) * STOP_LOSS_LOCK_IN_FRACTION;
        let candidate = match position.side {
            Side::Long => position.average_price + lock_in,
            Side::Short => position.average_price - lock_in,
        };
        let improves = match position.side {
            Side::Long => candidate > position.stop_loss,
            Side::Short => candidate < position.stop_loss,
        };
        if improves {
            position.stop_loss = candidate;
        }
    }

    let breached = match position.side {
        Side::Long => position.current_price <= position.stop_loss,
        Side::Short => position.current_price >= position.stop_loss,
    };
    if !breached {
        return None;
    }
    Some(ExitAction::Full(
        ExitCondition::new(position.symbol.clone(), ExitKind::StopLoss, ExitPriority::StopOrTrailOrScalp, "stop-loss hit")
            .with_trigger_price(position.current_price),
    ))
}

fn target_with_partial_booking(position: &mut Position, is_option: bool) -> Option<ExitAction> {
    let touched = match position.side {
        Side::Long => position.current_price >= position.target,
        Side::Short => position.current_price <= position.target,
    };
    if !touched {
        return None;
    }

    if position.partial_profit_booked {
        return Some(ExitAction::Full(
            ExitCondition::new(
                position.symbol.clone(),
                ExitKind::Target,
                ExitPriority::Target,
                "target re-touched after partial booking",
            )
            .with_trigger_price(position.current_price),
        ));
    }

    let book_qty = position.quantity / 2;
    let full_exit_required = is_option || position.quantity <= 10 || book_qty < 10;
    if full_exit_required {
        return Some(ExitAction::Full(
            ExitCondition::new(position.symbol.clone(), ExitKind::Target, ExitPriority::Target, "target reached, full exit")
                .with_trigger_price(position.current_price),
        ));
    }

    let tighten = favorable_move(position) * TARGET_TIGHTEN_FRACTION;
    position.stop_loss = match position.side {
        Side::Long => position.average_price + tighten,
        Side::Short => position.average_price - tighten,
    };
    position.partial_profit_booked = true;

    Some(ExitAction::Partial {
        condition: ExitCondition::new(
            position.symbol.clone(),
            ExitKind::Target,
            ExitPriority::Target,
            "target reached, partial booking",
        )
        .with_trigger_price(position.current_price),
        quantity: book_qty,
    })
}

fn trailing_stop(position: &mut Position) -> Option<ExitAction> {
    if position.pnl_pct() > TRAILING_ARM_PNL_PCT {
        let move_amt = favorable_move(position);
        let floor = position.average_price * TRAILING_MIN_PROFIT_LOCK;
        let candidate = match position.side {
            Side::Long => {
                let raw = position.current_price - move_amt * TRAILING_TRAIL_FRACTION;
                raw.max(floor)
            }
            Side::Short => {
                let raw = position.current_price + move_amt * TRAILING_TRAIL_FRACTION;
                let short_floor = position.average_price * (Decimal::from(2) - TRAILING_MIN_PROFIT_LOCK);
                raw.min(short_floor)
            }
        };
        let improves = match position.side {
            Side::Long => position.trailing_stop.map_or(true, |ts| candidate > ts),
            Side::Short => position.trailing_stop.map_or(true, |ts| candidate < ts),
        };
        if improves {
            position.trailing_stop = Some(candidate);
        }
    }

    let Some(ts) = position.trailing_stop else {
        return None;
    };
    let breached = match position.side {
        Side::Long => position.current_price <= ts,
        Side::Short => position.current_price >= ts,
    };
    if !breached {
        return None;
    }
    Some(ExitAction::Full(
        ExitCondition::new(position.symbol.clone(), ExitKind::TrailingStop, ExitPriority::StopOrTrailOrScalp, "trailing stop hit")
            .with_trigger_price(position.current_price),
    ))
}

fn risk_based(position: &Position, ctx: &ExitContext) -> Option<ExitAction> {
    if !ctx.risk_emergency_stop && !ctx.daily_loss_breached {
        return None;
    }
    let reason = if ctx.risk_emergency_stop {
        "risk manager emergency stop"
    } else {
        "daily loss limit breached"
    };
    Some(ExitAction::Full(
        ExitCondition::new(position.symbol.clone(), ExitKind::RiskBased, ExitPriority::Mandatory, reason)
            .with_trigger_price(position.current_price),
    ))
}
