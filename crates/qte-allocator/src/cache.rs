use std::time::{Duration, Instant};

/// A single TTL-guarded cached value, refreshed on demand by the owner.
///
/// Mirrors the allocator's four independent caches (strategy weights, user
/// weights, rankings, user shares), each with its own TTL, rather than one
/// global invalidation clock.
pub struct TtlCache<T> {
    value: T,
    ttl: Duration,
    refreshed_at: Instant,
}

impl<T> TtlCache<T> {
    /// The cache starts already stale (refreshed_at backdated by `ttl`) so
    /// the first call through the owner's refresh path always populates it,
    /// rather than serving the placeholder `initial` value until the TTL
    /// naturally elapses.
    pub fn new(initial: T, ttl: Duration) -> Self {
        Self {
            value: initial,
            ttl,
            refreshed_at: Instant::now().checked_sub(ttl).unwrap_or_else(Instant::now),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.refreshed_at.elapsed() >= self.ttl
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.refreshed_at = Instant::now();
    }
}
