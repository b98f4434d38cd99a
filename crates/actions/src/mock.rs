//! `MockAction` — a test double for `ActionHandler`.
//!
//! Useful in unit and integration tests where a real handler is either
//! unavailable or irrelevant.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ActionContext, ActionError, ActionHandler};

/// Behaviour injected into `MockAction` at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Succeed immediately.
    Succeed,
    /// Succeed after sleeping for the given duration.
    SucceedAfter(Duration),
    /// Fail with `ActionError::Failed`.
    Fail(String),
    /// Never complete. Only a timeout gets the engine past this one.
    Hang,
}

/// A single recorded invocation.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub node_id: String,
    pub config: Value,
    pub payload: Value,
}

/// A mock handler that records every call it receives and returns a
/// programmer-specified result.
pub struct MockAction {
    /// What the handler will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// Reported through [`ActionHandler::is_idempotent`].
    pub idempotent: bool,
    /// All calls seen by this handler (in call order).
    pub calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockAction {
    fn with_behaviour(behaviour: MockBehaviour) -> Self {
        Self {
            behaviour,
            idempotent: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds.
    pub fn succeeding() -> Self {
        Self::with_behaviour(MockBehaviour::Succeed)
    }

    /// Create a mock that succeeds after `delay`.
    pub fn succeeding_after(delay: Duration) -> Self {
        Self::with_behaviour(MockBehaviour::SucceedAfter(delay))
    }

    /// Create a mock that always fails with the given message.
    pub fn failing(msg: impl Into<String>) -> Self {
        Self::with_behaviour(MockBehaviour::Fail(msg.into()))
    }

    /// Create a mock whose calls never return.
    pub fn hanging() -> Self {
        Self::with_behaviour(MockBehaviour::Hang)
    }

    /// Mark the mock as idempotent.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Number of times this handler has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Node IDs of every invocation, in call order.
    pub fn called_nodes(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.node_id.clone())
            .collect()
    }
}

#[async_trait]
impl ActionHandler for MockAction {
    async fn execute(&self, config: &Value, ctx: &ActionContext) -> Result<(), ActionError> {
        self.calls.lock().unwrap().push(MockCall {
            node_id: ctx.node_id.clone(),
            config: config.clone(),
            payload: ctx.payload.clone(),
        });

        match &self.behaviour {
            MockBehaviour::Succeed => Ok(()),
            MockBehaviour::SucceedAfter(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            MockBehaviour::Fail(msg) => Err(ActionError::Failed(msg.clone())),
            MockBehaviour::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn is_idempotent(&self) -> bool {
        self.idempotent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx(node_id: &str) -> ActionContext {
        ActionContext {
            rule_id: Uuid::new_v4(),
            organization_id: None,
            node_id: node_id.into(),
            payload: json!({ "amount": 10 }),
        }
    }

    #[tokio::test]
    async fn records_calls_and_succeeds() {
        let mock = MockAction::succeeding();
        mock.execute(&json!({ "tag": "coffee" }), &ctx("tag")).await.unwrap();

        assert_eq!(mock.call_count(), 1);
        let calls = mock.calls.lock().unwrap();
        assert_eq!(calls[0].config["tag"], "coffee");
        assert_eq!(calls[0].payload["amount"], 10);
    }

    #[tokio::test]
    async fn failing_mock_returns_failed_error() {
        let mock = MockAction::failing("smtp refused");
        let err = mock.execute(&Value::Null, &ctx("mail")).await.unwrap_err();
        assert_eq!(err, ActionError::Failed("smtp refused".into()));
        assert_eq!(err.to_string(), "smtp refused");
        assert_eq!(mock.called_nodes(), vec!["mail"]);
    }

    #[test]
    fn idempotency_is_opt_in() {
        assert!(!MockAction::succeeding().is_idempotent());
        assert!(MockAction::succeeding().idempotent().is_idempotent());
    }
}
