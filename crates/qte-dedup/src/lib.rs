//! qte-dedup — Signal Deduplicator.
//!
//! Keeps per-symbol accept fingerprints and post-exit cooldowns in a
//! [`SharedStore`] so they survive a daemon restart, not just an in-process
//! struct field.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use qte_schemas::Signal;
use qte_store::{get_json, set_json, set_json_with_ttl, SharedStore, StoreError};
use serde::{Deserialize, Serialize};

const FINGERPRINT_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_POST_EXIT_COOLDOWN: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupRejection {
    PositionExists,
    DuplicateFingerprint,
    PostExitCooldown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupResult {
    Accept,
    Reject(DedupRejection),
}

impl DedupResult {
    pub fn is_accept(&self) -> bool {
        matches!(self, DedupResult::Accept)
    }
}

#[derive(Serialize, Deserialize)]
struct AcceptedFingerprint {
    fingerprint: u64,
    accepted_at: DateTime<Utc>,
}

pub struct Deduplicator<'a> {
    store: &'a dyn SharedStore,
    post_exit_cooldown: Duration,
}

impl<'a> Deduplicator<'a> {
    pub fn new(store: &'a dyn SharedStore) -> Self {
        Self {
            store,
            post_exit_cooldown: DEFAULT_POST_EXIT_COOLDOWN,
        }
    }

    pub fn with_cooldown(store: &'a dyn SharedStore, post_exit_cooldown: Duration) -> Self {
        Self {
            store,
            post_exit_cooldown,
        }
    }

    fn fingerprint(signal: &Signal) -> u64 {
        let mut hasher = DefaultHasher::new();
        format!("{:?}", signal.action).hash(&mut hasher);
        signal.entry_price.round_dp(2).hash(&mut hasher);
        signal.strategy_name.hash(&mut hasher);
        hasher.finish()
    }

    fn fingerprint_key(symbol: &str) -> String {
        format!("dedup:fingerprint:{symbol}")
    }

    fn cooldown_key(symbol: &str, date: NaiveDate) -> String {
        format!("dedup:cooldown:{date}:{symbol}")
    }

    /// Runs all three rejection rules in order. `has_open_position` is
    /// supplied by the caller (the position tracker), not looked up here,
    /// to keep this crate free of a dependency on the positions book.
    pub async fn check(
        &self,
        signal: &Signal,
        has_open_position: bool,
        now: DateTime<Utc>,
    ) -> Result<DedupResult, StoreError> {
        if has_open_position {
            return Ok(DedupResult::Reject(DedupRejection::PositionExists));
        }

        let fp_key = Self::fingerprint_key(&signal.symbol);
        if let Some(prev) = get_json::<AcceptedFingerprint>(self.store, &fp_key).await? {
            let candidate = Self::fingerprint(signal);
            let age = now.signed_duration_since(prev.accepted_at);
            if prev.fingerprint == candidate && age < chrono::Duration::minutes(5) && age >= chrono::Duration::zero() {
                return Ok(DedupResult::Reject(DedupRejection::DuplicateFingerprint));
            }
        }

        let cooldown_key = Self::cooldown_key(&signal.symbol, now.date_naive());
        if let Some(until) = get_json::<DateTime<Utc>>(self.store, &cooldown_key).await? {
            if now < until {
                return Ok(DedupResult::Reject(DedupRejection::PostExitCooldown));
            }
        }

        Ok(DedupResult::Accept)
    }

    /// Records that `signal` was accepted, for the duplicate-fingerprint
    /// rule's 5-minute window.
    pub async fn mark_accepted(&self, signal: &Signal, now: DateTime<Utc>) -> Result<(), StoreError> {
        let record = AcceptedFingerprint {
            fingerprint: Self::fingerprint(signal),
            accepted_at: now,
        };
        set_json_with_ttl(self.store, &Self::fingerprint_key(&signal.symbol), &record, FINGERPRINT_TTL).await
    }

    /// Records that a position on `symbol` exited at `now`, starting the
    /// post-exit cooldown.
    pub async fn mark_exit(&self, symbol: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let until = now
            + chrono::Duration::from_std(self.post_exit_cooldown).unwrap_or_else(|_| chrono::Duration::zero());
        set_json(self.store, &Self::cooldown_key(symbol, now.date_naive()), &until).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qte_schemas::Action;
    use qte_store::InMemoryStore;
    use rust_decimal::Decimal;

    fn signal(symbol: &str, price: f64) -> Signal {
        Signal::new(
            "momentum_breakout",
            symbol,
            Action::Buy,
            1,
            Decimal::try_from(price).unwrap(),
            Decimal::try_from(price * 0.99).unwrap(),
            Decimal::try_from(price * 1.02).unwrap(),
            7.0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn rejects_when_position_already_open() {
        let store = InMemoryStore::new();
        let dedup = Deduplicator::new(&store);
        let result = dedup.check(&signal("RELIANCE", 100.0), true, Utc::now()).await.unwrap();
        assert_eq!(result, DedupResult::Reject(DedupRejection::PositionExists));
    }

    #[tokio::test]
    async fn first_signal_is_accepted() {
        let store = InMemoryStore::new();
        let dedup = Deduplicator::new(&store);
        let result = dedup.check(&signal("RELIANCE", 100.0), false, Utc::now()).await.unwrap();
        assert_eq!(result, DedupResult::Accept);
    }

    #[tokio::test]
    async fn identical_fingerprint_within_five_minutes_is_rejected() {
        let store = InMemoryStore::new();
        let dedup = Deduplicator::new(&store);
        let now = Utc::now();
        let s = signal("RELIANCE", 100.0);
        dedup.mark_accepted(&s, now).await.unwrap();

        let later = now + chrono::Duration::minutes(2);
        let result = dedup.check(&s, false, later).await.unwrap();
        assert_eq!(result, DedupResult::Reject(DedupRejection::DuplicateFingerprint));
    }

    #[tokio::test]
    async fn identical_fingerprint_after_five_minutes_is_accepted() {
        let store = InMemoryStore::new();
        let dedup = Deduplicator::new(&store);
        let now = Utc::now();
        let s = signal("RELIANCE", 100.0);
        dedup.mark_accepted(&s, now).await.unwrap();

        let later = now + chrono::Duration::minutes(6);
        let result = dedup.check(&s, false, later).await.unwrap();
        assert_eq!(result, DedupResult::Accept);
    }

    #[tokio::test]
    async fn post_exit_cooldown_blocks_new_entries() {
        let store = InMemoryStore::new();
        let dedup = Deduplicator::with_cooldown(&store, Duration::from_secs(600));
        let now = Utc::now();
        dedup.mark_exit("RELIANCE", now).await.unwrap();

        let soon = now + chrono::Duration::minutes(5);
        let result = dedup.check(&signal("RELIANCE", 100.0), false, soon).await.unwrap();
        assert_eq!(result, DedupResult::Reject(DedupRejection::PostExitCooldown));

        let later = now + chrono::Duration::minutes(11);
        let result = dedup.check(&signal("RELIANCE", 100.0), false, later).await.unwrap();
        assert_eq!(result, DedupResult::Accept);
    }
}
