use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
    Critical,
}

/// A structured event on the control-plane stream.
///
/// The core never formats these for display; the dashboard is an external
/// collaborator that renders them. Producing one of these is how every
/// component surfaces a user-visible failure or notable state change
/// without raising an exception across a component boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub kind: String,
    pub severity: EventSeverity,
    pub component: String,
    pub title: String,
    pub description: String,
    pub symbols: Option<Vec<String>>,
    pub capital: Option<Decimal>,
    pub daily_pnl: Option<Decimal>,
    pub open_positions: Option<u32>,
    pub ts: DateTime<Utc>,
}

impl ControlEvent {
    pub fn new(
        kind: impl Into<String>,
        severity: EventSeverity,
        component: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: kind.into(),
            severity,
            component: component.into(),
            title: title.into(),
            description: description.into(),
            symbols: None,
            capital: None,
            daily_pnl: None,
            open_positions: None,
            ts,
        }
    }
}

/// Well-known event kinds referenced by multiple components. The event bus
/// cuts the orchestrator/risk/tracker/monitor cyclic reference graph by
/// replacing direct calls with notifications.
pub mod kinds {
    pub const POSITION_OPENED: &str = "position.opened";
    pub const POSITION_CLOSED: &str = "position.closed";
    pub const RISK_EMERGENCY_STOP: &str = "risk.emergency_stop";
    pub const BIAS_CHANGED: &str = "bias.changed";

    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_STOPPED: &str = "run.stopped";
    pub const RUN_PAUSED: &str = "run.paused";
    pub const RUN_RESUMED: &str = "run.resumed";
    pub const POSITION_CLOSE_ALL: &str = "position.close_all";
    pub const RISK_LOSS_LIMIT_OVERRIDDEN: &str = "risk.loss_limit_overridden";
}
