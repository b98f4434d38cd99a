//! Background event processing.
//!
//! `EventWorkerPool` feeds events from a bounded channel to a fixed set of
//! tokio tasks, each calling [`RuleEngine::dispatch`]. Separate events run in
//! parallel; the rules of a single event still run in order inside one task.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::EngineError;
use crate::models::Event;
use crate::rule_engine::RuleEngine;

pub struct EventWorkerPool {
    sender: Mutex<Option<mpsc::Sender<Event>>>,
    handles: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl EventWorkerPool {
    /// Start `workers` tasks (at least one) behind a queue of `capacity` events.
    pub fn spawn(engine: RuleEngine, workers: usize, capacity: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<Event>(capacity.max(1));
        let shared_rx = Arc::new(AsyncMutex::new(rx));

        let handles = (0..workers)
            .map(|worker_id| {
                let rx = Arc::clone(&shared_rx);
                let engine = engine.clone();
                tokio::spawn(async move {
                    loop {
                        let event = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        let Some(event) = event else {
                            break;
                        };
                        match engine.dispatch(&event).await {
                            Ok(logs) => debug!(worker_id, rules_run = logs.len(), "event processed"),
                            Err(e) => error!(worker_id, event_type = %event.trigger_type, error = %e, "event dispatch failed"),
                        }
                    }
                    debug!(worker_id, "event worker stopped");
                })
            })
            .collect();

        info!(workers, capacity, "event worker pool started");
        Self {
            sender: Mutex::new(Some(tx)),
            handles: AsyncMutex::new(handles),
        }
    }

    /// Queue an event, waiting while the queue is full.
    pub async fn submit(&self, event: Event) -> Result<(), EngineError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(EngineError::WorkerPoolClosed)?;
        sender.send(event).await.map_err(|_| EngineError::WorkerPoolClosed)
    }

    /// Stop accepting events, drain the queue and wait for every worker.
    pub async fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner).take();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "event worker panicked");
            }
        }
        info!("event worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{AutomationGraph, Node, Rule, TriggerType};
    use crate::registry::ActionRegistry;
    use crate::store::{InMemoryLogStore, InMemoryRuleStore};
    use actions::mock::MockAction;
    use actions::ActionType;
    use serde_json::json;
    use uuid::Uuid;

    fn tagging_rule(org: Uuid) -> Rule {
        let graph = AutomationGraph::new()
            .with_node("t", Node::trigger(TriggerType::TransactionCreated))
            .with_node("tag", Node::action(ActionType::AddTag, json!({ "tag": "seen" })))
            .with_edge("t", "tag");
        Rule::new(org, "tag everything", TriggerType::TransactionCreated, graph)
    }

    #[tokio::test]
    async fn queued_events_are_all_processed_before_shutdown_returns() {
        let org = Uuid::new_v4();
        let logs = Arc::new(InMemoryLogStore::new());
        let tag = Arc::new(MockAction::succeeding());
        let engine = RuleEngine::new(
            Arc::new(InMemoryRuleStore::with_rules([tagging_rule(org)])),
            logs.clone(),
            ActionRegistry::new().with(ActionType::AddTag, tag.clone()),
            &EngineConfig::default(),
        );

        let pool = EventWorkerPool::spawn(engine, 3, 4);
        for n in 0..10 {
            pool.submit(Event::new(TriggerType::TransactionCreated, org, json!({ "n": n })))
                .await
                .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(logs.len(), 10);
        assert_eq!(tag.call_count(), 10);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let engine = RuleEngine::new(
            Arc::new(InMemoryRuleStore::new()),
            Arc::new(InMemoryLogStore::new()),
            ActionRegistry::new(),
            &EngineConfig::default(),
        );
        let pool = EventWorkerPool::spawn(engine, 1, 1);
        pool.shutdown().await;

        let err = pool
            .submit(Event::new(TriggerType::WebhookReceived, Uuid::new_v4(), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::WorkerPoolClosed));
    }
}
