//! Router assembly and the listening loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{middleware, Router};
use tokio::net::TcpListener;

use super::handlers;
use super::middleware::{cors, request_log};
use crate::core::config::Config;
use crate::registry::repository::ClientRepository;

/// Path prefix for every route.
pub const API_PREFIX: &str = "/asit/api/v1";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Domain operations.
    pub repository: Arc<ClientRepository>,
    /// Build revision surfaced by the health endpoint.
    pub revision: String,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::add_client),
        )
        .route(
            "/clients/:client_id",
            get(handlers::get_client)
                .put(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route("/clients/:client_id/keys", get(handlers::list_client_keys))
        .route(
            "/client_keys/:key",
            get(handlers::get_client_by_key)
                .post(handlers::add_client_key)
                .delete(handlers::delete_client_key),
        )
        .with_state(state);

    // Layers run outermost-last: the request log wraps CORS, so preflight
    // answers are logged and carry a request id too.
    Router::new()
        .nest(API_PREFIX, api)
        .layer(middleware::from_fn(cors))
        .layer(middleware::from_fn(request_log))
}

/// Serve until SIGINT or SIGTERM.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
