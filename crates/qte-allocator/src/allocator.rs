use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qte_schemas::{Signal, UserAccount};
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cache::TtlCache;
use crate::types::{AllocatedOrder, AllocationError};

const LOW_PERFORMANCE_FLOOR: f64 = 0.3;
const CANDIDATE_POOL: usize = 20;
const MAX_ALLOCATED_USERS: usize = 10;
const BACKGROUND_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const STRATEGY_WEIGHTS_TTL: Duration = Duration::from_secs(5 * 60);
const USER_WEIGHTS_TTL: Duration = Duration::from_secs(60 * 60);
const RANKINGS_TTL: Duration = Duration::from_secs(60);
const USER_SHARES_TTL: Duration = Duration::from_secs(5 * 60);

/// Pro-rata multi-user trade allocator.
///
/// Four independently-TTL'd caches keep the hot allocation path (`allocate`)
/// free of per-call recomputation: strategy weights (fed by the strategy
/// performance feedback loop), per-user weights, a margin-sorted user
/// ranking, and pro-rata capital shares. `ensure_background_refresh_running`
/// lazily starts a task that keeps all four warm; `allocate` also refreshes
/// synchronously on a cache miss so correctness never depends on the
/// background task having run.
pub struct TradeAllocator {
    users: HashMap<String, UserAccount>,
    strategy_weights: TtlCache<HashMap<String, f64>>,
    user_weights: TtlCache<HashMap<String, f64>>,
    rankings: TtlCache<Vec<String>>,
    user_shares: TtlCache<HashMap<String, f64>>,
    min_trade_interval_secs: i64,
    max_position_size_pct: f64,
    background_task: Option<JoinHandle<()>>,
}

impl TradeAllocator {
    pub fn new(min_trade_interval_secs: i64, max_position_size_pct: f64) -> Self {
        Self {
            users: HashMap::new(),
            strategy_weights: TtlCache::new(HashMap::new(), STRATEGY_WEIGHTS_TTL),
            user_weights: TtlCache::new(HashMap::new(), USER_WEIGHTS_TTL),
            rankings: TtlCache::new(Vec::new(), RANKINGS_TTL),
            user_shares: TtlCache::new(HashMap::new(), USER_SHARES_TTL),
            min_trade_interval_secs,
            max_position_size_pct,
            background_task: None,
        }
    }

    pub fn upsert_user(&mut self, account: UserAccount) {
        self.users.insert(account.user_id.clone(), account);
    }

    pub fn set_strategy_weight(&mut self, strategy_name: &str, weight: f64) {
        let mut weights = self.strategy_weights.get().clone();
        weights.insert(strategy_name.to_string(), weight);
        self.strategy_weights.set(weights);
    }

    pub fn set_user_weight(&mut self, user_id: &str, weight: f64) {
        let mut weights = self.user_weights.get().clone();
        weights.insert(user_id.to_string(), weight);
        self.user_weights.set(weights);
    }

    pub fn record_trade(&mut self, user_id: &str, now: DateTime<Utc>) {
        if let Some(user) = self.users.get_mut(user_id) {
            user.last_trade_at = Some(now);
        }
    }

    /// Recomputes the derived caches (ranking, pro-rata shares) if stale.
    /// Strategy/user weight caches are fed externally via
    /// `set_strategy_weight`/`set_user_weight`, so there's nothing to derive
    /// for them here beyond respecting their own TTL in the callers.
    pub fn refresh_derived_caches(&mut self) {
        if self.rankings.is_stale() {
            let mut by_margin: Vec<(String, rust_decimal::Decimal)> = self
                .users
                .values()
                .map(|u| (u.user_id.clone(), u.available_margin))
                .collect();
            by_margin.sort_by(|a, b| b.1.cmp(&a.1));
            let ranked: Vec<String> = by_margin.into_iter().map(|(id, _)| id).collect();
            self.rankings.set(ranked);
        }

        if self.user_shares.is_stale() {
            let total_capital: f64 = self
                .users
                .values()
                .filter(|u| u.enabled)
                .map(|u| u.capital.to_f64().unwrap_or_default())
                .sum();
            let mut shares = HashMap::new();
            if total_capital > 0.0 {
                for user in self.users.values().filter(|u| u.enabled) {
                    let share = user.capital.to_f64().unwrap_or_default() / total_capital;
                    shares.insert(user.user_id.clone(), share);
                }
            }
            self.user_shares.set(shares);
        }
    }

    fn eligible_users(&self, now: DateTime<Utc>) -> Vec<String> {
        self.rankings
            .get()
            .iter()
            .take(CANDIDATE_POOL)
            .filter(|id| {
                self.users
                    .get(*id)
                    .map(|u| u.is_eligible(now, self.min_trade_interval_secs))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// The full pro-rata pipeline: strategy-weight gate, eligible-user
    /// ranking, margin filter, pro-rata sizing, per-user position-size cap.
    pub fn allocate(
        &mut self,
        strategy_name: &str,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<Vec<AllocatedOrder>, AllocationError> {
        self.refresh_derived_caches();

        let strategy_weight = *self.strategy_weights.get().get(strategy_name).unwrap_or(&1.0);
        if strategy_weight < LOW_PERFORMANCE_FLOOR {
            return Err(AllocationError::LowPerformingStrategy { weight: strategy_weight });
        }

        let eligible = self.eligible_users(now);
        if eligible.is_empty() {
            return Err(AllocationError::NoEligibleUsers);
        }

        let entry_price = signal.entry_price.to_f64().unwrap_or_default();
        let required_margin = entry_price * signal.quantity as f64;

        let with_margin: Vec<&String> = eligible
            .iter()
            .filter(|id| {
                self.users
                    .get(*id)
                    .map(|u| u.available_margin.to_f64().unwrap_or_default() >= required_margin)
                    .unwrap_or(false)
            })
            .collect();
        if with_margin.is_empty() {
            return Err(AllocationError::NoMarginAvailable);
        }

        let mut allocated = Vec::new();
        for user_id in with_margin.into_iter().take(MAX_ALLOCATED_USERS) {
            let share = self.user_shares.get().get(user_id).copied().unwrap_or(0.0);
            let quantity = ((signal.quantity as f64) * share * strategy_weight).floor();
            if quantity <= 0.0 {
                continue;
            }
            let quantity = quantity as u64;

            let Some(user) = self.users.get(user_id) else { continue };
            let max_position_value = user.capital.to_f64().unwrap_or_default() * self.max_position_size_pct;
            let position_value = entry_price * quantity as f64;
            if position_value > max_position_value {
                continue;
            }

            allocated.push(AllocatedOrder::from_signal(signal, user_id.clone(), quantity));
            self.record_trade(user_id, now);
        }

        Ok(allocated)
    }

    /// Single-user fallback used when the full pipeline can't find an
    /// eligible user through the rotation/margin pipeline at all: hand the
    /// whole signal to the first enabled user with capital, unscaled.
    pub fn allocate_single_user_fallback(
        &mut self,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<Vec<AllocatedOrder>, AllocationError> {
        let user_id = self
            .users
            .values()
            .find(|u| u.is_eligible(now, self.min_trade_interval_secs))
            .map(|u| u.user_id.clone())
            .ok_or(AllocationError::NoEligibleUsers)?;

        self.record_trade(&user_id, now);
        Ok(vec![AllocatedOrder::from_signal(signal, user_id, signal.quantity)])
    }

    /// Tries the full pipeline first; on any allocation failure, falls back
    /// to the single-user path rather than dropping the signal entirely.
    pub fn allocate_with_fallback(
        &mut self,
        strategy_name: &str,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Vec<AllocatedOrder> {
        match self.allocate(strategy_name, signal, now) {
            Ok(orders) if !orders.is_empty() => orders,
            _ => self.allocate_single_user_fallback(signal, now).unwrap_or_default(),
        }
    }

    /// Starts the background cache-refresh loop if it isn't already
    /// running. Lazily invoked on first allocation rather than at
    /// construction time, so constructing an allocator never requires a
    /// running Tokio reactor.
    pub async fn ensure_background_refresh_running(shared: &Arc<Mutex<Self>>) {
        let mut guard = shared.lock().await;
        let needs_spawn = match &guard.background_task {
            Some(handle) => handle.is_finished(),
            None => true,
        };
        if !needs_spawn {
            return;
        }

        let shared = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(BACKGROUND_REFRESH_INTERVAL);
            loop {
                interval.tick().await;
                let mut allocator = shared.lock().await;
                allocator.refresh_derived_caches();
            }
        });
        guard.background_task = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qte_schemas::Action;
    use rust_decimal::Decimal;

    fn signal(quantity: u64) -> Signal {
        Signal::new(
            "momentum_breakout",
            "RELIANCE",
            Action::Buy,
            quantity,
            Decimal::from(100),
            Decimal::from(95),
            Decimal::from(110),
            8.0,
            Utc::now(),
        )
    }

    fn allocator_with_users(n: usize, capital: i64) -> TradeAllocator {
        let mut allocator = TradeAllocator::new(300, 0.1);
        for i in 0..n {
            let mut account = UserAccount::new(format!("user-{i}"), Decimal::from(capital), Decimal::from(capital));
            account.last_trade_at = None;
            allocator.upsert_user(account);
        }
        allocator
    }

    #[test]
    fn low_performing_strategy_is_skipped() {
        let mut allocator = allocator_with_users(3, 1_000_000);
        allocator.set_strategy_weight("momentum_breakout", 0.1);
        let result = allocator.allocate("momentum_breakout", &signal(100), Utc::now());
        assert_eq!(
            result,
            Err(AllocationError::LowPerformingStrategy { weight: 0.1 })
        );
    }

    #[test]
    fn pro_rata_allocation_splits_across_users_by_capital_share() {
        let mut allocator = allocator_with_users(2, 1_000_000);
        allocator.set_strategy_weight("momentum_breakout", 1.0);
        let orders = allocator.allocate("momentum_breakout", &signal(100), Utc::now()).unwrap();
        assert_eq!(orders.len(), 2);
        let total: u64 = orders.iter().map(|o| o.quantity).sum();
        assert!(total <= 100);
        assert!(total > 0);
    }

    #[test]
    fn no_users_falls_back_with_error() {
        let mut allocator = TradeAllocator::new(300, 0.1);
        let result = allocator.allocate("momentum_breakout", &signal(100), Utc::now());
        assert_eq!(result, Err(AllocationError::NoEligibleUsers));
    }

    #[test]
    fn fallback_path_allocates_full_quantity_to_one_user() {
        let mut allocator = allocator_with_users(1, 1_000_000);
        let orders = allocator.allocate_single_user_fallback(&signal(50), Utc::now()).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 50);
    }

    #[test]
    fn rotation_interval_excludes_recently_traded_users() {
        let mut allocator = allocator_with_users(1, 1_000_000);
        let now = Utc::now();
        allocator.record_trade("user-0", now);
        allocator.set_strategy_weight("momentum_breakout", 1.0);
        let result = allocator.allocate("momentum_breakout", &signal(10), now + chrono::Duration::seconds(30));
        assert_eq!(result, Err(AllocationError::NoEligibleUsers));
    }

    #[tokio::test]
    async fn background_refresh_task_starts_once() {
        let allocator = Arc::new(Mutex::new(allocator_with_users(2, 1_000_000)));
        TradeAllocator::ensure_background_refresh_running(&allocator).await;
        let had_task = allocator.lock().await.background_task.is_some();
        assert!(had_task);
        TradeAllocator::ensure_background_refresh_running(&allocator).await;
        assert!(allocator.lock().await.background_task.is_some());
    }
}
