//! qte-daemon entry point.
//!
//! Thin by design: parse args, load config, build the `TradingController`,
//! wire middleware, and serve. All route handlers live in `routes.rs`; all
//! controller logic lives in `controller.rs`.
//!
//! Exit codes: 0 normal shutdown (ctrl-c), 1 fatal init error (bad config or
//! failed bind), 2 emergency stop requested externally (an operator issued
//! `close_all` over the control API).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use qte_config::UnusedKeyPolicy;
use qte_daemon::controller::{spawn_monitor_loop, TradingController};
use qte_daemon::routes;
use qte_store::InMemoryStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "qte-daemon", about = "Intraday NSE/NFO paper-trading control plane")]
struct Cli {
    /// Path to a TOML config file layered over the built-in defaults.
    #[arg(long, env = "QTE_CONFIG_FILE")]
    config: Option<String>,

    /// Fail startup instead of warning when the config carries unused keys.
    #[arg(long)]
    strict_config: bool,

    /// Starting capital seeded into the single paper-trading account.
    #[arg(long, default_value_t = 1_000_000.0)]
    initial_capital: f64,

    /// Address to bind the control-plane HTTP API to.
    #[arg(long, env = "QTE_DAEMON_ADDR")]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    let unused_key_policy = if cli.strict_config { UnusedKeyPolicy::Fail } else { UnusedKeyPolicy::Warn };
    let load_result = match qte_config::load(cli.config.as_deref(), unused_key_policy) {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(severity = "critical", %err, "fatal: failed to load configuration");
            std::process::exit(1);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    let controller = TradingController::new(load_result.config, store, cli.initial_capital, chrono::Utc::now());
    spawn_monitor_loop(Arc::clone(&controller));

    let app = routes::build_router(Arc::clone(&controller))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = cli.addr.unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8899)));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(severity = "critical", %err, "fatal: failed to bind control-plane address");
            std::process::exit(1);
        }
    };
    info!("qte-daemon listening on http://{addr}");

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, shutting down");
            }
            _ = controller.shutdown.notified() => {
                info!("close_all requested process shutdown");
            }
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server crashed")?;

    if controller.emergency_exit_requested() {
        std::process::exit(2);
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}

/// CORS: allow only localhost origins, matching a dev dashboard running on
/// one of the usual local dev-server ports.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
