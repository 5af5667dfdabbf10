//! qte-monitor — the Position Monitor: the loop that decides, every few
//! seconds, whether any open position needs to exit.
//!
//! [`evaluator`] holds the pure per-position exit rules; [`monitor`] ties
//! them to the shared [`qte_positions::PositionTracker`] and the broker
//! seams ([`monitor::QuoteSource`], [`monitor::BrokerPositionSource`],
//! [`monitor::ExitExecutor`]) that the daemon wires up to real broker calls.

pub mod evaluator;
pub mod monitor;

pub use evaluator::{evaluate_exit, ExitAction, ExitContext};
pub use monitor::{tick_interval_secs, BrokerPositionSource, ExitExecutor, PositionMonitor, QuoteSource, TickInputs, TickReport};
