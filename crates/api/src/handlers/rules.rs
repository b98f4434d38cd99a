use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use engine::{validate_rule, AutomationGraph, ExecutionLog, LogPage, PageRequest, Rule, TriggerType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::AppState;
use crate::ApiError;

/// Body of a manual trigger: empty, or any JSON value used as the context.
pub async fn trigger(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExecutionLog>, ApiError> {
    let context = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(serde_json::from_slice::<Value>(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?)
    };

    let log = state.engine.trigger_manually(id, context).await?;
    Ok(Json(log))
}

pub async fn logs(
    Path(id): Path<Uuid>,
    Query(page): Query<PageRequest>,
    State(state): State<AppState>,
) -> Result<Json<LogPage>, ApiError> {
    let page = state.engine.list_logs(id, page).await?;
    Ok(Json(page))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRuleDto {
    pub trigger_type: TriggerType,
    pub graph: AutomationGraph,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    /// Topological order of the graph, trigger first.
    pub order: Vec<String>,
}

pub async fn validate(Json(dto): Json<ValidateRuleDto>) -> Result<Json<ValidationReport>, ApiError> {
    let rule = Rule::new(Uuid::nil(), "draft", dto.trigger_type, dto.graph);
    let order = validate_rule(&rule)?;
    Ok(Json(ValidationReport { valid: true, order }))
}
