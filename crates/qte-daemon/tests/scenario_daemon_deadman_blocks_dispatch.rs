//! Scenario: a monitor tick that detects a daily-loss breach auto-latches
//! the emergency stop and auto-pauses a running session, and that pause is
//! sticky until an operator explicitly overrides it.
//!
//! 1. A running session that takes a monitor tick while emergency stop is
//!    latched is auto-transitioned from running to paused.
//! 2. `resume` is refused (403) after the auto-pause, same as a manually
//!    triggered emergency stop.
//! 3. After `override_loss_limit`, `resume` succeeds and the run goes back
//!    to running.
//!
//! All tests are pure in-process; no DB or network required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use qte_config::AppConfig;
use qte_daemon::controller::TradingController;
use qte_daemon::routes;
use qte_store::InMemoryStore;
use tower::ServiceExt; // oneshot

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn empty_post(uri: &str) -> Request<axum::body::Body> {
    Request::builder().method("POST").uri(uri).body(axum::body::Body::empty()).unwrap()
}

fn new_controller() -> Arc<TradingController> {
    TradingController::new(AppConfig::default(), Arc::new(InMemoryStore::new()), 1_000_000.0, Utc::now())
}

#[tokio::test]
async fn monitor_tick_auto_pauses_a_running_session_once_emergency_stop_latches() {
    let controller = new_controller();
    let router = routes::build_router(Arc::clone(&controller));

    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;

    controller.risk.lock().await.trigger_emergency_stop();
    controller.run_monitor_tick(Utc::now()).await;

    let (_, body) = call(router, Request::builder().method("GET").uri("/v1/status").body(axum::body::Body::empty()).unwrap()).await;
    assert_eq!(parse_json(body)["state"], "paused", "a latched emergency stop must auto-pause a running session");
}

#[tokio::test]
async fn resume_is_refused_after_the_tick_driven_auto_pause() {
    let controller = new_controller();
    let router = routes::build_router(Arc::clone(&controller));

    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;
    controller.risk.lock().await.trigger_emergency_stop();
    controller.run_monitor_tick(Utc::now()).await;

    let (status, body) = call(router, empty_post("/v1/control/resume")).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "resume must stay blocked while the emergency stop is still latched");
    assert!(parse_json(body)["error"].as_str().unwrap_or("").contains("GATE_REFUSED"));
}

#[tokio::test]
async fn resume_succeeds_once_override_loss_limit_clears_the_tick_driven_latch() {
    let controller = new_controller();
    let router = routes::build_router(Arc::clone(&controller));

    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;
    controller.risk.lock().await.trigger_emergency_stop();
    controller.run_monitor_tick(Utc::now()).await;

    let (blocked_status, _) = call(router.clone(), empty_post("/v1/control/resume")).await;
    assert_eq!(blocked_status, StatusCode::FORBIDDEN);

    let override_req = Request::builder()
        .method("POST")
        .uri("/v1/control/override_loss_limit")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::json!({"reason": "reviewed drawdown, resuming"}).to_string()))
        .unwrap();
    let (override_status, _) = call(router.clone(), override_req).await;
    assert_eq!(override_status, StatusCode::OK);

    let (status, body) = call(router, empty_post("/v1/control/resume")).await;
    assert_eq!(status, StatusCode::OK, "resume must succeed after override_loss_limit");
    assert_eq!(parse_json(body)["state"], "running");
}
