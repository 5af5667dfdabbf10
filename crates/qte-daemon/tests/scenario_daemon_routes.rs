//! In-process scenario tests for qte-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot` — no network I/O required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use qte_config::AppConfig;
use qte_daemon::controller::TradingController;
use qte_daemon::routes;
use qte_store::InMemoryStore;
use tower::ServiceExt; // oneshot

fn make_router() -> axum::Router {
    let controller = TradingController::new(AppConfig::default(), Arc::new(InMemoryStore::new()), 1_000_000.0, Utc::now());
    routes::build_router(controller)
}

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

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder().method("GET").uri(uri).body(axum::body::Body::empty()).unwrap()
}

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "qte-daemon");
}

#[tokio::test]
async fn status_starts_stopped_with_zero_positions() {
    let (status, body) = call(make_router(), get("/v1/status")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["state"], "stopped");
    assert_eq!(json["emergency_stop"], false);
    assert_eq!(json["open_positions"], 0);
}

#[tokio::test]
async fn start_sets_state_running() {
    let router = make_router();
    let (status, body) = call(router, empty_post("/v1/control/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["state"], "running");
}

#[tokio::test]
async fn start_then_stop_returns_to_stopped() {
    let router = make_router();
    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;
    let (status, body) = call(router, empty_post("/v1/control/stop")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["state"], "stopped");
}

#[tokio::test]
async fn pause_then_resume_round_trips() {
    let router = make_router();
    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;
    let (_, pause_body) = call(router.clone(), empty_post("/v1/control/pause")).await;
    assert_eq!(parse_json(pause_body)["state"], "paused");

    let (status, resume_body) = call(router, empty_post("/v1/control/resume")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(resume_body)["state"], "running");
}

#[tokio::test]
async fn close_position_404s_when_nothing_is_open() {
    let router = make_router();
    let (status, body) = call(router, empty_post("/v1/control/close_position/RELIANCE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["error"].as_str().unwrap_or("").contains("RELIANCE"));
}

#[tokio::test]
async fn close_all_stops_the_run_and_requests_process_exit() {
    let router = make_router();
    let (_, _) = call(router.clone(), empty_post("/v1/control/start")).await;

    let (status, body) = call(router.clone(), empty_post("/v1/control/close_all")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(parse_json(body).is_array());

    let (_, status_body) = call(router, get("/v1/status")).await;
    assert_eq!(parse_json(status_body)["state"], "stopped");
}

#[tokio::test]
async fn override_loss_limit_accepts_a_reason() {
    let router = make_router();
    let req = Request::builder()
        .method("POST")
        .uri("/v1/control/override_loss_limit")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::json!({"reason": "manual review cleared"}).to_string()))
        .unwrap();

    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["state"], "stopped");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (status, _) = call(make_router(), get("/v1/does_not_exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
