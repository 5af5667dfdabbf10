//! Axum router and HTTP handlers for qte-daemon's control plane.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::api_types::{ErrorResponse, GateRefusedResponse, HealthResponse, OverrideLossLimitRequest};
use crate::controller::{TradingController, SERVICE, VERSION};

pub fn build_router(controller: Arc<TradingController>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/control/start", post(start))
        .route("/v1/control/stop", post(stop))
        .route("/v1/control/pause", post(pause))
        .route("/v1/control/resume", post(resume))
        .route("/v1/control/close_position/:symbol", post(close_position))
        .route("/v1/control/close_all", post(close_all))
        .route("/v1/control/override_loss_limit", post(override_loss_limit))
        .with_state(controller)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: SERVICE,
            version: VERSION,
        }),
    )
}

async fn status_handler(State(controller): State<Arc<TradingController>>) -> impl IntoResponse {
    (StatusCode::OK, Json(controller.status(Utc::now()).await))
}

async fn start(State(controller): State<Arc<TradingController>>) -> Response {
    match controller.start(Utc::now()).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => (StatusCode::FORBIDDEN, Json(GateRefusedResponse { error })).into_response(),
    }
}

async fn stop(State(controller): State<Arc<TradingController>>) -> impl IntoResponse {
    (StatusCode::OK, Json(controller.stop(Utc::now()).await))
}

async fn pause(State(controller): State<Arc<TradingController>>) -> impl IntoResponse {
    (StatusCode::OK, Json(controller.pause(Utc::now()).await))
}

async fn resume(State(controller): State<Arc<TradingController>>) -> Response {
    match controller.resume(Utc::now()).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(error) => (StatusCode::FORBIDDEN, Json(GateRefusedResponse { error })).into_response(),
    }
}

async fn close_position(State(controller): State<Arc<TradingController>>, Path(symbol): Path<String>) -> Response {
    match controller.close_position(&symbol, Utc::now()).await {
        Some(closed) => (StatusCode::OK, Json(closed)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no open position on {symbol}"),
            }),
        )
            .into_response(),
    }
}

async fn close_all(State(controller): State<Arc<TradingController>>) -> impl IntoResponse {
    info!("close_all requested via control API");
    (StatusCode::OK, Json(controller.close_all(Utc::now()).await))
}

async fn override_loss_limit(
    State(controller): State<Arc<TradingController>>,
    Json(body): Json<OverrideLossLimitRequest>,
) -> impl IntoResponse {
    (StatusCode::OK, Json(controller.override_loss_limit(&body.reason, Utc::now()).await))
}

/// Streams every published `ControlEvent` as a server-sent event.
async fn stream(State(controller): State<Arc<TradingController>>) -> Response {
    let rx = controller.subscribe_events();
    let events = broadcast_to_sse(rx);
    Sse::new(events).keep_alive(KeepAlive::new()).into_response()
}

fn broadcast_to_sse(
    rx: tokio::sync::broadcast::Receiver<qte_schemas::ControlEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => serde_json::to_string(&event).ok().map(|data| Ok(Event::default().event(event.kind.clone()).data(data))),
        Err(_) => None,
    })
}
