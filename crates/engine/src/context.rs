//! The context a rule graph is evaluated against.

use serde_json::Value;
use uuid::Uuid;

use crate::models::Event;

/// How a traversal was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Automatic dispatch of an incoming event.
    Event,
    /// Caller-authorised run through the manual trigger gateway.
    Manual,
}

/// Everything conditions and actions can see during one traversal.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub organization_id: Option<Uuid>,
    /// Condition fields are resolved against this value.
    pub payload: Value,
    pub invocation: Invocation,
}

impl EventContext {
    pub fn from_event(event: &Event) -> Self {
        Self {
            organization_id: Some(event.organization_id),
            payload: event.payload.clone(),
            invocation: Invocation::Event,
        }
    }

    pub fn manual(organization_id: Uuid, payload: Value) -> Self {
        Self {
            organization_id: Some(organization_id),
            payload,
            invocation: Invocation::Manual,
        }
    }
}
