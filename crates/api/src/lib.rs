//! `api` crate — HTTP surface of the rule engine.
//!
//! Exposes:
//!   POST /api/v1/events                 dispatch synchronously, returns the logs
//!   POST /api/v1/events/enqueue         hand the event to the worker pool (202)
//!   POST /api/v1/rules/validate         save-time graph validation
//!   POST /api/v1/rules/{id}/trigger     manual trigger, optional JSON context body
//!   GET  /api/v1/rules/{id}/logs        paginated execution logs, newest first

pub mod error;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;
pub use handlers::AppState;

/// Router with every route plus tracing and CORS layers.
pub fn app(state: AppState) -> axum::Router {
    handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `bind` and serve until `shutdown` resolves.
pub async fn serve<F>(bind: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "API listening");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}
