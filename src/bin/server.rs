//! task-router HTTP server binary.
//!
//! Loads `.env`, builds the built-in capability registry confined to the
//! data root, and serves `/run`, `/read` and `/health`.
//!
//! # Usage
//!
//! ```bash
//! AIPROXY_TOKEN=... cargo run -- --data-root ./data --port 8000
//! RUST_LOG=debug,task_router=trace cargo run
//! ```

use clap::Parser;
use task_router::capabilities::builtin_registry;
use task_router::config::ServerConfig;
use task_router::server::{app_router, AppState};
use task_router::{OpenAiProvider, PathConfinement, TaskRouter};

#[tokio::main]
async fn main() {
    // Missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let cfg = ServerConfig::parse();

    let confine = PathConfinement::new(&cfg.data_root);
    if !confine.root().is_dir() {
        tracing::warn!(root = %confine.root().display(), "data root does not exist yet");
    }

    // Registration problems are fatal: never serve with a broken registry.
    let registry = match builtin_registry(&confine) {
        Ok(registry) => registry,
        Err(e) => {
            tracing::error!("capability registration failed: {e}");
            std::process::exit(1);
        }
    };

    let mut provider = OpenAiProvider::new(&cfg.base_url).with_timeout(cfg.model_timeout());
    match cfg.api_key {
        Some(ref key) => provider = provider.with_api_key(key),
        None => tracing::warn!("AIPROXY_TOKEN not set; calling the model without credentials"),
    }

    let router = match TaskRouter::new(provider, registry, cfg.router_config()) {
        Ok(router) => router,
        Err(e) => {
            tracing::error!("router setup failed: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!(
        capabilities = ?router.registry().names(),
        model = %cfg.model,
        "router ready"
    );

    let state = AppState::new(router, confine);
    let shutdown = state.shutdown.clone();
    let app = app_router(state);

    let bind_addr = cfg.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {bind_addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("task-router listening on {bind_addr}");

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::warn!("cannot listen for ctrl-c: {e}"),
        }
    });

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
