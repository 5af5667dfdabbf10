//! qte-allocator — pro-rata multi-user trade allocation.
//!
//! Splits one strategy signal across eligible user accounts by capital
//! share, gated by strategy performance, margin availability, trade
//! rotation timing, and per-user position-size caps. See
//! [`TradeAllocator`] for the pipeline and cache layout.

mod allocator;
mod cache;
mod types;

pub use allocator::TradeAllocator;
pub use cache::TtlCache;
pub use types::{AllocatedOrder, AllocationError};
