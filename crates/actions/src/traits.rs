//! The `ActionHandler` trait — the contract every action must fulfil.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::ActionError;

/// Context handed to a handler for a single action invocation.
///
/// Defined here (in the actions crate) so both the engine and individual
/// handler implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Rule whose graph contains the action node.
    pub rule_id: Uuid,
    /// Organization the triggering event belongs to, if any.
    pub organization_id: Option<Uuid>,
    /// ID of the action node inside the rule graph.
    pub node_id: String,
    /// Event payload the rule is being evaluated against.
    pub payload: Value,
}

/// The core action trait.
///
/// Handlers must be cheap to share: the engine keeps them behind an `Arc` and
/// may call the same handler concurrently from independent graph branches.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Perform the side effect described by `config`.
    async fn execute(&self, config: &Value, ctx: &ActionContext) -> Result<(), ActionError>;

    /// Whether repeating the same call has no additional effect.
    ///
    /// Rules whose handlers are all idempotent may run concurrently with
    /// themselves; everything else is serialised per rule.
    fn is_idempotent(&self) -> bool {
        false
    }
}
