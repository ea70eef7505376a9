/*
 * Responsibility
 * - load Config → build dependencies → assemble the Router
 * - apply middleware (auth gate, CORS, HTTP layers)
 * - start axum::serve() with graceful shutdown
 */
use std::sync::Arc;
use std::time::Duration;
use std::{panic, process};

use anyhow::Result;
use axum::{Router, routing::get};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware;
use crate::repos::identity_repo::{IdentityStore, PgIdentityStore};
use crate::services::auth::build_token_codec;
use crate::state::AppState;

const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    // RUST_LOG wins when set, e.g.
    // RUST_LOG=info,logistics_auth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so the panic is noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting logistics auth gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    let codec = build_token_codec(config)?;

    // Lazy pool: the store may be unreachable at startup; lookups then fail
    // with 503 instead of the process refusing to boot.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(DB_ACQUIRE_TIMEOUT)
        .connect_lazy(&config.database_url)?;
    let identity_store: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool));

    Ok(AppState::new(codec, identity_store))
}

/// Routes with the authorization gate installed in front of every one of them.
pub fn build_api(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes());

    middleware::auth::gate::apply(routes, state.clone()).with_state(state)
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = build_api(state);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
