//! qte-execution — broker boundary and order lifecycle.
//!
//! [`broker::BrokerAdapter`] is the only way any code in this workspace
//! reaches a live or paper broker. [`order_manager::OrderManager`] is the
//! sole path orders take to get there: it applies the bypass and
//! exit-after-cutoff gates, serializes submission per user behind a FIFO
//! queue, and tracks each broker order through the [`oms::state_machine`]
//! state machine.

mod allocator_adapter;
mod broker;
mod id_map;
mod order_manager;
mod oms;
mod types;

pub use broker::{BrokerAdapter, BrokerError, BrokerResult};
pub use id_map::BrokerOrderMap;
pub use oms::state_machine::{OmsEvent, OmsOrder, OrderState, TransitionError};
pub use order_manager::{closing_action, OrderManager, PlacedOrder, SignalAllocator};
pub use types::{BrokerPosition, Candle, Margins, PositionBook};
