//! HTTP request layer
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /api/v1/wallet` - apply a deposit or withdraw
//! - `GET /api/v1/wallets/:wallet_id` - read a committed balance
//! - `GET /health` - liveness probe returning `OK`
//!
//! Request validation (nil wallet id, unknown operation type, non-positive
//! amount) happens here; the coordinator only ever sees well-formed
//! operations.

mod dto;
mod handlers;

use std::future::Future;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::core::{BalanceStore, OperationCoordinator};

pub use dto::{ApiError, BalanceResponse, OperationRequest, StatusResponse};

/// Build the axum `Router` serving `coordinator`
pub fn router<S: BalanceStore + 'static>(coordinator: OperationCoordinator<S>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/wallet", post(handlers::apply_operation::<S>))
        .route("/api/v1/wallets/:wallet_id", get(handlers::get_balance::<S>))
        .with_state(coordinator)
}

/// Serve on `addr` until `shutdown` resolves
pub async fn serve<S, F>(
    coordinator: OperationCoordinator<S>,
    addr: &str,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    S: BalanceStore + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(shutdown)
        .await
}
