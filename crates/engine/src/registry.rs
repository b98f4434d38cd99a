//! Action handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use actions::logging::LoggingAction;
use actions::{ActionHandler, ActionType};
use tracing::warn;

use crate::models::AutomationGraph;

/// Maps action types to shared `ActionHandler` implementations.
///
/// `stop_execution` is handled by the executor itself and can't be registered.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry where every action only logs what it would have done.
    pub fn dry_run() -> Self {
        ActionType::ALL
            .into_iter()
            .filter(|t| !t.is_intrinsic())
            .fold(Self::new(), |registry, t| {
                registry.with(t, Arc::new(LoggingAction::new(t)))
            })
    }

    /// Register (or replace) the handler for `action_type`.
    pub fn register(&mut self, action_type: ActionType, handler: Arc<dyn ActionHandler>) {
        if action_type.is_intrinsic() {
            warn!(action = %action_type, "ignoring handler for engine-intrinsic action");
            return;
        }
        self.handlers.insert(action_type, handler);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, action_type: ActionType, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(action_type, handler);
        self
    }

    pub fn get(&self, action_type: ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&action_type).cloned()
    }

    /// `true` when every external action in `graph` has a registered,
    /// idempotent handler, so overlapping runs of the rule are harmless.
    pub fn all_idempotent(&self, graph: &AutomationGraph) -> bool {
        graph
            .actions()
            .filter(|(_, a)| !a.action_type.is_intrinsic())
            .all(|(_, a)| self.handlers.get(&a.action_type).is_some_and(|h| h.is_idempotent()))
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<_> = self.handlers.keys().collect();
        registered.sort();
        f.debug_struct("ActionRegistry").field("registered", &registered).finish()
    }
}
