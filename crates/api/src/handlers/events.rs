use axum::{extract::State, http::StatusCode, Json};
use engine::{Event, ExecutionLog};
use serde_json::{json, Value};

use super::AppState;
use crate::ApiError;

pub async fn dispatch(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<Json<Vec<ExecutionLog>>, ApiError> {
    let logs = state.engine.dispatch(&event).await?;
    Ok(Json(logs))
}

pub async fn enqueue(
    State(state): State<AppState>,
    Json(event): Json<Event>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.workers.submit(event).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "event accepted" }))))
}
