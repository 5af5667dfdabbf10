//! qte-strategy — the strategy pool that feeds candidate [`Signal`]s into the
//! enhancer/dedup/decision pipeline.
//!
//! Strategy generation itself is exogenous to the control plane's risk
//! contract: strategies only ever produce *candidate* signals, never orders,
//! and every signal still has to clear the enhancer, deduplicator, decision
//! engine, risk manager, and allocator before anything reaches a broker.

mod host;
mod mean_reversion;
mod momentum;
mod plugin_registry;
mod types;

pub use host::StrategyPool;
pub use mean_reversion::VwapMeanReversion;
pub use momentum::MomentumBreakout;
pub use plugin_registry::{PluginRegistry, RegistryError, StrategyFactory, StrategyMeta};
pub use types::{QuoteHistory, Strategy};
