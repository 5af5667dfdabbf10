//! qte-schemas — typed wire/event records shared across the trading control
//! plane.
//!
//! Every shared entity lives here as a tagged struct/enum rather than a
//! loosely-typed map.

mod account;
mod bias;
mod event;
mod exit;
mod internals;
mod order;
mod position;
mod quote;
mod signal;
pub mod symbol;

pub use account::UserAccount;
pub use bias::{BiasDirection, MarketBias, Regime};
pub use event::{kinds as event_kinds, ControlEvent, EventSeverity};
pub use exit::{ExitCondition, ExitKind, ExitPriority};
pub use internals::{Breadth, CompositeScores, MarketInternals, TimePhase, Volatility, VolumeProfile};
pub use order::{BrokerOrderStatus, Order, OrderType, OrderUpdate, Product};
pub use position::{Position, Side};
pub use quote::{MarketSnapshot, Quote};
pub use signal::{Action, HybridMode, Signal};
pub use symbol::is_option;
