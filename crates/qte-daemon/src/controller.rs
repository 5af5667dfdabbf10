//! `TradingController` — the single root object every handler is injected
//! with, rather than reaching for global state. It owns every wired
//! component behind an `Arc`/lock, the control-event broadcast bus, and the
//! business logic behind the control-plane HTTP API; `routes` only
//! translates HTTP in and out of these methods.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use qte_allocator::TradeAllocator;
use qte_bias::{BiasConfig, BiasEngine};
use qte_broker_paper::PaperBroker;
use qte_config::AppConfig;
use qte_decision::{DecisionContext, DecisionReason, DecisionResult, PositionOpeningDecision};
use qte_dedup::Deduplicator;
use qte_enhancer::SignalEnhancer;
use qte_execution::{BrokerAdapter, OrderManager};
use qte_monitor::{tick_interval_secs, BrokerPositionSource, ExitExecutor, PositionMonitor, QuoteSource, TickInputs};
use qte_positions::{ClosedPosition, PositionTracker};
use qte_risk::{AlertSeverity, RiskManager, RiskPosition, TradeRiskRequest};
use qte_schemas::{event_kinds, is_option, Action, ControlEvent, EventSeverity, Position, Quote, Side, Signal, UserAccount};
use qte_store::SharedStore;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, Notify, RwLock};
use tracing::{error, info, warn};

pub const SERVICE: &str = "qte-daemon";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
const EVENT_BUS_CAPACITY: usize = 1024;
/// Paper-trading runs one account; a real multi-user deployment would
/// resolve this from the authenticated caller instead.
const DEFAULT_USER_ID: &str = "paper-account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Point-in-time snapshot returned by `GET /v1/status` and every control
/// command that changes state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub state: RunState,
    pub emergency_stop: bool,
    pub daily_pnl: f64,
    pub open_positions: u32,
    pub notes: Option<String>,
}

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs()
}

struct BrokerQuotes(Arc<PaperBroker>);

#[async_trait::async_trait]
impl QuoteSource for BrokerQuotes {
    async fn quotes(&self, symbols: &[String]) -> BTreeMap<String, Quote> {
        self.0.get_quote(symbols).await.unwrap_or_default()
    }
}

struct BrokerPositionQty(Arc<PaperBroker>);

#[async_trait::async_trait]
impl BrokerPositionSource for BrokerPositionQty {
    async fn broker_quantity(&self, symbol: &str) -> u64 {
        match self.0.get_positions().await {
            Ok(book) => book
                .net
                .iter()
                .find(|p| p.tradingsymbol == symbol)
                .map(|p| p.quantity.unsigned_abs())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

struct OrderManagerExecutor(Arc<OrderManager<PaperBroker>>);

#[async_trait::async_trait]
impl ExitExecutor for OrderManagerExecutor {
    async fn submit_exit(&self, symbol: &str, action: Action, quantity: u64) -> Result<(), String> {
        let mut order = qte_schemas::Order::new(DEFAULT_USER_ID, symbol, action, quantity, "position_monitor");
        order.metadata.insert("is_exit".to_string(), serde_json::json!(true));
        self.0
            .submit_for_user(DEFAULT_USER_ID, order)
            .await
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}

pub struct TradingController {
    pub config: AppConfig,
    pub store: Arc<dyn SharedStore>,
    pub broker: Arc<PaperBroker>,
    pub order_manager: Arc<OrderManager<PaperBroker>>,
    pub positions: Mutex<PositionTracker>,
    pub risk: Mutex<RiskManager>,
    pub allocator: Mutex<TradeAllocator>,
    pub bias: Mutex<BiasEngine>,
    pub monitor: Mutex<PositionMonitor>,
    pub enhancer: Mutex<SignalEnhancer>,
    pub events: broadcast::Sender<ControlEvent>,
    /// Signalled when an HTTP-triggered `close_all` decides the process
    /// should exit (see `emergency_exit_requested`); `main` races this
    /// against ctrl-c to pick the daemon's exit code.
    pub shutdown: Notify,
    state: RwLock<RunState>,
    notes: RwLock<Option<String>>,
    initial_capital: f64,
    emergency_exit_requested: AtomicBool,
}

impl TradingController {
    pub fn new(config: AppConfig, store: Arc<dyn SharedStore>, initial_capital: f64, now: DateTime<Utc>) -> Arc<Self> {
        let broker = Arc::new(PaperBroker::new());
        let order_manager = Arc::new(OrderManager::new(Arc::clone(&broker)));

        let mut allocator = TradeAllocator::new(
            config.allocator.min_trade_interval_secs,
            config.allocator.max_position_size_pct,
        );
        let capital = Decimal::try_from(initial_capital).unwrap_or(Decimal::ZERO);
        allocator.upsert_user(UserAccount::new(DEFAULT_USER_ID, capital, capital));

        let (events, _rx) = broadcast::channel(EVENT_BUS_CAPACITY);

        Arc::new(Self {
            risk: Mutex::new(RiskManager::new(initial_capital, config.risk.clone())),
            allocator: Mutex::new(allocator),
            bias: Mutex::new(BiasEngine::new(BiasConfig::default(), now)),
            monitor: Mutex::new(PositionMonitor::new()),
            enhancer: Mutex::new(SignalEnhancer::new()),
            positions: Mutex::new(PositionTracker::new()),
            order_manager,
            broker,
            store,
            config,
            events,
            shutdown: Notify::new(),
            state: RwLock::new(RunState::Stopped),
            notes: RwLock::new(None),
            initial_capital,
            emergency_exit_requested: AtomicBool::new(false),
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    pub fn emergency_exit_requested(&self) -> bool {
        self.emergency_exit_requested.load(Ordering::SeqCst)
    }

    fn publish(&self, event: ControlEvent) {
        if event.severity == EventSeverity::Critical {
            error!(severity = "critical", kind = %event.kind, title = %event.title, "{}", event.description);
        } else {
            info!(kind = %event.kind, title = %event.title, "{}", event.description);
        }
        let _ = self.events.send(event);
    }

    pub async fn status(&self, now: DateTime<Utc>) -> StatusSnapshot {
        let state = *self.state.read().await;
        let risk = self.risk.lock().await;
        let emergency_stop = risk.is_emergency_stopped();
        let daily_realized = risk.daily_realized_pnl();
        drop(risk);
        let positions = self.positions.lock().await;
        let open_positions = positions.len() as u32;
        let daily_pnl = daily_realized + positions.total_unrealized_pnl().to_f64().unwrap_or_default();
        drop(positions);
        let _ = now;
        StatusSnapshot {
            service: SERVICE,
            version: VERSION,
            uptime_secs: uptime_secs(),
            state,
            emergency_stop,
            daily_pnl,
            open_positions,
            notes: self.notes.read().await.clone(),
        }
    }

    /// Moves into `Running`. Refused while an emergency stop is latched —
    /// `override_loss_limit` must clear it first.
    pub async fn start(&self, now: DateTime<Utc>) -> Result<StatusSnapshot, String> {
        if self.risk.lock().await.is_emergency_stopped() {
            return Err("GATE_REFUSED: emergency stop active; override_loss_limit required".to_string());
        }
        *self.state.write().await = RunState::Running;
        self.publish(ControlEvent::new(
            event_kinds::RUN_STARTED,
            EventSeverity::Info,
            "controller",
            "trading started",
            "control plane moved to Running",
            now,
        ));
        Ok(self.status(now).await)
    }

    pub async fn stop(&self, now: DateTime<Utc>) -> StatusSnapshot {
        *self.state.write().await = RunState::Stopped;
        self.publish(ControlEvent::new(
            event_kinds::RUN_STOPPED,
            EventSeverity::Info,
            "controller",
            "trading stopped",
            "control plane moved to Stopped",
            now,
        ));
        self.status(now).await
    }

    /// Blocks new entries; the position monitor keeps managing exits on
    /// whatever's still open.
    pub async fn pause(&self, now: DateTime<Utc>) -> StatusSnapshot {
        *self.state.write().await = RunState::Paused;
        self.publish(ControlEvent::new(
            event_kinds::RUN_PAUSED,
            EventSeverity::Info,
            "controller",
            "trading paused",
            "new entries blocked; exits continue",
            now,
        ));
        self.status(now).await
    }

    pub async fn resume(&self, now: DateTime<Utc>) -> Result<StatusSnapshot, String> {
        if self.risk.lock().await.is_emergency_stopped() {
            return Err("GATE_REFUSED: emergency stop active; override_loss_limit required".to_string());
        }
        *self.state.write().await = RunState::Running;
        self.publish(ControlEvent::new(
            event_kinds::RUN_RESUMED,
            EventSeverity::Info,
            "controller",
            "trading resumed",
            "control plane moved to Running",
            now,
        ));
        Ok(self.status(now).await)
    }

    /// Closes one symbol at market, tagged to bypass the order manager's
    /// normal entry/cutoff gating the same way the position monitor's own
    /// exits are. Idempotent: no open position on `symbol` is a harmless
    /// `None`, not an error.
    pub async fn close_position(&self, symbol: &str, now: DateTime<Utc>) -> Option<ClosedPosition> {
        let (quantity, exit_action) = {
            let positions = self.positions.lock().await;
            let position = positions.get(symbol)?;
            let exit_action = match position.side {
                Side::Long => Action::Sell,
                Side::Short => Action::Buy,
            };
            (position.quantity, exit_action)
        };

        let mut order = qte_schemas::Order::new(DEFAULT_USER_ID, symbol, exit_action, quantity, "manual_close");
        order.metadata.insert("closing_action".to_string(), serde_json::json!(true));
        order.metadata.insert("is_exit".to_string(), serde_json::json!(true));
        if let Err(err) = self.order_manager.submit_for_user(DEFAULT_USER_ID, order).await {
            warn!(symbol, %err, "close_position: broker unavailable, closing tracker directly");
        }

        let symbols = vec![symbol.to_string()];
        let quote_price = self
            .broker
            .get_quote(&symbols)
            .await
            .ok()
            .and_then(|quotes| quotes.get(symbol).map(|q| q.ltp));

        let mut positions = self.positions.lock().await;
        let exit_price = quote_price.or_else(|| positions.get(symbol).map(|p| p.current_price))?;
        let closed = positions.close(symbol, exit_price, now);
        drop(positions);

        if let Some(closed) = &closed {
            self.risk
                .lock()
                .await
                .record_realized_pnl(closed.realized_pnl.to_f64().unwrap_or_default());
            let dedup = Deduplicator::new(self.store.as_ref());
            if let Err(err) = dedup.mark_exit(symbol, now).await {
                warn!(symbol, %err, "failed to record post-exit cooldown");
            }
            self.publish(ControlEvent::new(
                event_kinds::POSITION_CLOSED,
                EventSeverity::Info,
                "controller",
                format!("{symbol} closed"),
                format!("manual close, realized pnl {}", closed.realized_pnl),
                now,
            ));
        }
        closed
    }

    /// Closes every open position, logs the action as CRITICAL, and asks
    /// the process to exit after the caller has the response (exit code 2 —
    /// "emergency stop requested externally").
    pub async fn close_all(&self, now: DateTime<Utc>) -> Vec<ClosedPosition> {
        let symbols: Vec<String> = {
            let positions = self.positions.lock().await;
            positions.symbols().map(str::to_string).collect()
        };

        let mut closed = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            if let Some(c) = self.close_position(symbol, now).await {
                closed.push(c);
            }
        }

        self.publish(ControlEvent::new(
            event_kinds::POSITION_CLOSE_ALL,
            EventSeverity::Critical,
            "controller",
            "close_all issued",
            format!("{} position(s) closed", closed.len()),
            now,
        ));

        *self.state.write().await = RunState::Stopped;
        self.emergency_exit_requested.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
        closed
    }

    /// Clears the emergency stop latch and logs the override as CRITICAL.
    pub async fn override_loss_limit(&self, reason: &str, now: DateTime<Utc>) -> StatusSnapshot {
        self.risk.lock().await.clear_emergency_stop();
        self.publish(ControlEvent::new(
            event_kinds::RISK_LOSS_LIMIT_OVERRIDDEN,
            EventSeverity::Critical,
            "controller",
            "loss limit override",
            format!("operator override: {reason}"),
            now,
        ));
        self.status(now).await
    }

    /// Evaluates one strategy signal end to end — bias, trading hours,
    /// risk, dedup, decisioning, then (if approved) allocation and order
    /// placement. Not invoked by the daemon's own loop: live market-data
    /// ingestion and strategy evaluation stay outside this process, so an
    /// external strategy host or test harness is the caller.
    pub async fn submit_signal(&self, mut signal: Signal, nifty_change_pct: f64, now: DateTime<Utc>) -> DecisionResult {
        if !matches!(*self.state.read().await, RunState::Running) {
            return DecisionResult::Rejected {
                reason: DecisionReason::Timing,
                detail: "control plane is not running".to_string(),
            };
        }

        let bias = {
            let mut bias_engine = self.bias.lock().await;
            bias_engine.push_nifty_change(nifty_change_pct);
            bias_engine.current()
        };

        let total_capital = self.initial_capital;
        let (trading_hours_ok, risk_decision) = {
            let held_positions: Vec<RiskPosition> = {
                let positions = self.positions.lock().await;
                positions
                    .all()
                    .map(|p| RiskPosition {
                        symbol: p.symbol.clone(),
                        quantity: p.quantity,
                        current_price: p.current_price.to_f64().unwrap_or_default(),
                        is_option: is_option(&p.symbol),
                    })
                    .collect()
            };
            let risk = self.risk.lock().await;
            let trading_hours_ok = risk.validate_trading_hours(now);
            let risk_decision = risk.validate_trade_risk(&TradeRiskRequest {
                symbol: signal.symbol.clone(),
                quantity: signal.quantity,
                price_per_share: signal.entry_price.to_f64().unwrap_or_default(),
                is_option: is_option(&signal.symbol),
                total_capital,
                held_positions,
            });
            (trading_hours_ok, risk_decision)
        };

        let symbols = vec![signal.symbol.clone()];
        let quote = self
            .broker
            .get_quote(&symbols)
            .await
            .ok()
            .and_then(|quotes| quotes.get(&signal.symbol).cloned());
        let quote = match quote {
            Some(quote) => quote,
            None => {
                warn!(symbol = %signal.symbol, "no quote available, rejecting signal before enhancement");
                return DecisionResult::Rejected {
                    reason: DecisionReason::Enhancement,
                    detail: "no quote available for signal enhancement".to_string(),
                };
            }
        };
        {
            let mut enhancer = self.enhancer.lock().await;
            enhancer.observe_quote(&quote);
            match enhancer.enhance(&signal, &quote) {
                Some(enhanced) => signal = enhanced,
                None => {
                    return DecisionResult::Rejected {
                        reason: DecisionReason::Enhancement,
                        detail: format!("{} dropped below the enhancement acceptance threshold", signal.symbol),
                    };
                }
            }
        }

        let has_open_position = self.positions.lock().await.has_open_position(&signal.symbol);
        let dedup = Deduplicator::new(self.store.as_ref());
        let dedup_result = match dedup.check(&signal, has_open_position, now).await {
            Ok(result) => result,
            Err(err) => {
                warn!(symbol = %signal.symbol, %err, "dedup store unavailable, rejecting signal");
                return DecisionResult::Rejected {
                    reason: DecisionReason::Duplicate,
                    detail: format!("dedup store unavailable: {err}"),
                };
            }
        };

        let ctx = DecisionContext {
            bias,
            risk_decision,
            dedup_result,
            trading_hours_ok,
            market_conditions_ok: true,
            available_capital: total_capital,
            total_capital,
            now,
        };
        let decision = PositionOpeningDecision::evaluate(&signal, nifty_change_pct, &ctx);

        if let DecisionResult::Approved(approval) = &decision {
            let mut sized_signal = signal.clone();
            sized_signal.quantity = approval.position_size;

            let placed = {
                let mut allocator = self.allocator.lock().await;
                self.order_manager
                    .place_strategy_order(&signal.strategy_name, &sized_signal, &mut *allocator, now)
                    .await
            };

            if let Err(err) = dedup.mark_accepted(&signal, now).await {
                warn!(symbol = %signal.symbol, %err, "failed to record dedup fingerprint");
            }

            for placed_order in placed {
                let side = match placed_order.order.action {
                    Action::Buy => Side::Long,
                    Action::Sell => Side::Short,
                };
                let position = Position::new(
                    placed_order.order.symbol.clone(),
                    side,
                    placed_order.order.quantity,
                    signal.entry_price,
                    signal.stop_loss,
                    signal.target,
                    now,
                    signal.strategy_name.clone(),
                );
                let opened = {
                    let mut positions = self.positions.lock().await;
                    positions.open(position).is_ok()
                };
                if opened {
                    self.publish(ControlEvent::new(
                        event_kinds::POSITION_OPENED,
                        EventSeverity::Info,
                        "controller",
                        format!("{} opened", placed_order.order.symbol),
                        format!("strategy {} via {}", signal.strategy_name, placed_order.user_id),
                        now,
                    ));
                }
            }
        }

        decision
    }

    /// One iteration of the position-monitor loop: refresh the portfolio
    /// risk book, then run the monitor's exit algorithm against the paper
    /// broker. A breached daily loss limit latches the emergency stop and
    /// drops the control plane to `Paused`, same as an operator-triggered
    /// stop would, so new entries halt until `override_loss_limit`.
    pub async fn run_monitor_tick(&self, now: DateTime<Utc>) {
        let unrealized = self
            .positions
            .lock()
            .await
            .total_unrealized_pnl()
            .to_f64()
            .unwrap_or_default();

        let (risk_emergency_stop, daily_loss_breached) = {
            let mut risk = self.risk.lock().await;
            let current_capital = self.initial_capital + risk.daily_realized_pnl() + unrealized;
            let snapshot = risk.monitor_portfolio_risk(current_capital, unrealized, now);
            let daily_loss_breached = snapshot
                .alerts
                .iter()
                .any(|a| a.code == "DAILY_LOSS" && a.severity == AlertSeverity::Critical);
            if daily_loss_breached && !risk.is_emergency_stopped() {
                risk.trigger_emergency_stop();
            }
            (risk.is_emergency_stopped(), daily_loss_breached)
        };

        let open_symbols: Vec<String> = {
            let positions = self.positions.lock().await;
            positions.symbols().map(str::to_string).collect()
        };
        if !open_symbols.is_empty() {
            if let Ok(fresh_quotes) = self.broker.get_quote(&open_symbols).await {
                let mut enhancer = self.enhancer.lock().await;
                for quote in fresh_quotes.values() {
                    enhancer.observe_quote(quote);
                }
            }
        }

        let quotes = BrokerQuotes(Arc::clone(&self.broker));
        let broker_positions = BrokerPositionQty(Arc::clone(&self.broker));
        let executor = OrderManagerExecutor(Arc::clone(&self.order_manager));
        let inputs = TickInputs {
            now,
            risk_emergency_stop,
            daily_loss_breached,
            quotes: &quotes,
            broker_positions: &broker_positions,
            executor: &executor,
        };

        let report = {
            let mut positions = self.positions.lock().await;
            let mut monitor = self.monitor.lock().await;
            monitor.tick(&mut positions, inputs).await
        };

        for event in report.events {
            self.publish(event);
        }
        for closed in &report.closed {
            self.risk
                .lock()
                .await
                .record_realized_pnl(closed.realized_pnl.to_f64().unwrap_or_default());
            self.enhancer
                .lock()
                .await
                .scoreboard_mut()
                .record_outcome(&closed.position.strategy, closed.realized_pnl > Decimal::ZERO);
            let dedup = Deduplicator::new(self.store.as_ref());
            if let Err(err) = dedup.mark_exit(&closed.position.symbol, now).await {
                warn!(symbol = %closed.position.symbol, %err, "failed to record post-exit cooldown");
            }
        }

        if risk_emergency_stop {
            let mut state = self.state.write().await;
            if *state == RunState::Running {
                *state = RunState::Paused;
            }
        }
    }
}

/// Runs `run_monitor_tick` on the cadence `qte_monitor::tick_interval_secs`
/// prescribes (5s during the active window, 30s otherwise).
pub fn spawn_monitor_loop(controller: Arc<TradingController>) {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            tokio::time::sleep(Duration::from_secs(tick_interval_secs(now))).await;
            controller.run_monitor_tick(Utc::now()).await;
        }
    });
}
