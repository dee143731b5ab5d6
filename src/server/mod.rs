//! HTTP surface of the gateway.
//!
//! The route table is fixed:
//!
//! | Method | Path                      | Handler            |
//! |--------|---------------------------|--------------------|
//! | POST   | `/register`               | register           |
//! | POST   | `/subscriptions/{handle}` | deliver            |
//! | GET    | `/vapid/public-key`       | public key         |
//!
//! Other methods on these paths get `405 Method Not Allowed` from the
//! method router; unknown paths get `404`.

// Rust guideline compliant 2026-02

mod handlers;

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;

use crate::gateway::DispatchGateway;

pub use handlers::{PublicKeyResponse, RegisterResponse};

/// Build the application router around `gateway`.
pub fn router(gateway: DispatchGateway) -> Router {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/subscriptions/{handle}", post(handlers::deliver))
        .route("/vapid/public-key", get(handlers::public_key))
        .layer(middleware::from_fn(log_requests))
        .with_state(gateway)
}

/// Serve on `listener` until `shutdown` resolves, then let in-flight
/// requests finish.
pub async fn serve<F>(listener: TcpListener, gateway: DispatchGateway, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("Listener has no local address")?;
    log::info!("Starting service on {}", addr);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    log::info!("Server stopped accepting connections");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("Received SIGINT, shutting down"),
        () = terminate => log::info!("Received SIGTERM, shutting down"),
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({:.1?})",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
