//! Route table and shared handler state.

pub mod events;
pub mod rules;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use engine::{EventWorkerPool, RuleEngine};

/// State cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: RuleEngine,
    pub workers: Arc<EventWorkerPool>,
}

impl AppState {
    pub fn new(engine: RuleEngine, workers: Arc<EventWorkerPool>) -> Self {
        Self { engine, workers }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/events", post(events::dispatch))
        .route("/api/v1/events/enqueue", post(events::enqueue))
        .route("/api/v1/rules/validate", post(rules::validate))
        .route("/api/v1/rules/:id/trigger", post(rules::trigger))
        .route("/api/v1/rules/:id/logs", get(rules::logs))
        .with_state(state)
}
