//! Order Manager — the core contract between allocation and the broker.
//!
//! Every order submitted to a broker passes through here. Two independent
//! gates run ahead of the per-user FIFO queue: the bypass rule (an order
//! tagged `bypass_all_checks`/`closing_action`/`EMERGENCY` skips gating
//! entirely, per [`Order::bypasses_all_checks`]) and the exit-after-cutoff
//! rule (new entries stop at the cutoff time; orders recognized as exits,
//! per [`Order::is_exit`], remain allowed). Neither gate consults the
//! broker; both are pure functions of the order and the clock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use qte_schemas::{Action, Order, Signal};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::broker::{BrokerAdapter, BrokerError};
use crate::id_map::BrokerOrderMap;
use crate::oms::state_machine::{OmsEvent, OmsOrder};

/// No new entries after this wall time (IST). Exits remain allowed.
const NEW_ENTRY_CUTOFF: NaiveTime = NaiveTime::from_hms_opt(15, 0, 0).unwrap();

/// A broker order submitted on behalf of one user, returned by
/// [`OrderManager::place_strategy_order`].
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub user_id: String,
    pub broker_order_id: String,
    pub order: Order,
}

/// Allocates a signal to users and returns the per-user order each should
/// receive. `qte-allocator::TradeAllocator` is the production implementation;
/// this trait keeps `OrderManager` from depending on the allocator crate
/// directly, so it can be exercised with a fixed allocation in tests.
pub trait SignalAllocator {
    fn allocate(&mut self, strategy_name: &str, signal: &Signal, now: DateTime<Utc>) -> Vec<(String, u64)>;
}

fn order_from_signal(signal: &Signal, user_id: impl Into<String>, quantity: u64) -> Order {
    let mut order = Order::new(user_id, signal.symbol.clone(), signal.action, quantity, signal.strategy_name.clone());
    order.price = Some(signal.entry_price);
    order.metadata = signal.metadata.clone();
    order
}

/// Per-user queue state: a FIFO of pending requests plus the OMS order
/// tracked per broker order id, all behind one mutex so a single task mutates
/// a given user's orders at a time.
#[derive(Default)]
struct UserQueue {
    pending: VecDeque<Order>,
    live_orders: HashMap<String, OmsOrder>,
}

pub struct OrderManager<B: BrokerAdapter> {
    broker: Arc<B>,
    id_map: Mutex<BrokerOrderMap>,
    queues: Mutex<HashMap<String, Arc<Mutex<UserQueue>>>>,
}

impl<B: BrokerAdapter> OrderManager<B> {
    pub fn new(broker: Arc<B>) -> Self {
        Self {
            broker,
            id_map: Mutex::new(BrokerOrderMap::new()),
            queues: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an order is allowed right now, independent of broker state.
    ///
    /// Bypass-tagged orders are always allowed. Otherwise: before the
    /// new-entry cutoff everything is allowed; at or after it, only orders
    /// recognized as exits are allowed.
    pub fn validate_order(&self, _user_id: &str, order: &Order, now_ist: DateTime<Utc>) -> bool {
        if order.bypasses_all_checks() {
            return true;
        }
        if now_ist.time() < NEW_ENTRY_CUTOFF {
            return true;
        }
        order.is_exit()
    }

    async fn queue_for(&self, user_id: &str) -> Arc<Mutex<UserQueue>> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserQueue::default())))
            .clone()
    }

    /// Allocate `signal` across users via `allocator`, submit each resulting
    /// order through its owner's FIFO queue, and return what was actually
    /// placed. Orders that fail [`validate_order`] are skipped, not queued.
    pub async fn place_strategy_order(
        &self,
        strategy_name: &str,
        signal: &Signal,
        allocator: &mut impl SignalAllocator,
        now_ist: DateTime<Utc>,
    ) -> Vec<PlacedOrder> {
        let allocations = allocator.allocate(strategy_name, signal, now_ist);
        let mut placed = Vec::with_capacity(allocations.len());

        for (user_id, quantity) in allocations {
            let order = order_from_signal(signal, user_id.clone(), quantity);
            if !self.validate_order(&user_id, &order, now_ist) {
                warn!(user_id = %user_id, symbol = %order.symbol, "order rejected by time/bypass gate");
                continue;
            }
            match self.submit_for_user(&user_id, order.clone()).await {
                Ok(broker_order_id) => placed.push(PlacedOrder {
                    user_id,
                    broker_order_id,
                    order,
                }),
                Err(err) => warn!(user_id = %user_id, %err, "broker rejected order"),
            }
        }

        placed
    }

    /// Submit one order for one user, serialized behind that user's queue
    /// lock so concurrent strategy signals never interleave a single user's
    /// broker calls.
    pub async fn submit_for_user(&self, user_id: &str, order: Order) -> Result<String, BrokerError> {
        let queue = self.queue_for(user_id).await;
        let mut guard = queue.lock().await;
        guard.pending.push_back(order.clone());

        let result = self.broker.place_order(&order).await;
        guard.pending.pop_front();

        match result {
            Ok(broker_order_id) => {
                self.id_map
                    .lock()
                    .await
                    .register(broker_order_id.clone(), broker_order_id.clone());
                guard.live_orders.insert(
                    broker_order_id.clone(),
                    OmsOrder::new(broker_order_id.clone(), order.symbol.clone(), order.quantity as i64),
                );
                info!(user_id, broker_order_id = %broker_order_id, "order submitted");
                Ok(broker_order_id)
            }
            Err(err) => Err(err),
        }
    }

    /// Cancel a live order for a user. No-op (returns `Ok`) if the order is
    /// already unknown or terminal.
    pub async fn cancel_for_user(&self, user_id: &str, broker_order_id: &str) -> Result<(), BrokerError> {
        let queue = self.queue_for(user_id).await;
        let mut guard = queue.lock().await;
        match guard.live_orders.get(broker_order_id) {
            Some(oms_order) if oms_order.state.is_terminal() => return Ok(()),
            Some(_) => {}
            None => return Ok(()),
        }
        self.broker.cancel_order(broker_order_id).await?;
        if let Some(oms_order) = guard.live_orders.get_mut(broker_order_id) {
            let _ = oms_order.apply(&OmsEvent::CancelRequest, None);
        }
        Ok(())
    }

    /// Apply a broker-pushed order update to the tracked OMS state for its
    /// owning user. Illegal transitions are logged and otherwise ignored;
    /// callers that need hard failure should inspect the returned bool.
    pub async fn apply_order_update(
        &self,
        user_id: &str,
        broker_order_id: &str,
        event: OmsEvent,
        event_id: Option<&str>,
    ) -> bool {
        let queue = self.queue_for(user_id).await;
        let mut guard = queue.lock().await;
        match guard.live_orders.get_mut(broker_order_id) {
            Some(order) => match order.apply(&event, event_id) {
                Ok(()) => true,
                Err(err) => {
                    warn!(user_id, broker_order_id, %err, "illegal OMS transition");
                    false
                }
            },
            None => {
                warn!(user_id, broker_order_id, "order update for unknown order");
                false
            }
        }
    }
}

/// Reverses [`Action`] at the boundary where a closing order needs the
/// opposite side of its originating position.
pub fn closing_action(opening: Action) -> Action {
    opening.opposite()
}
