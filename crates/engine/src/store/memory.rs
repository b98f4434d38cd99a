//! In-process stores backed by locked collections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ExecutionLogStore, PageRequest, RuleStore};
use crate::error::StoreError;
use crate::models::{ExecutionLog, LogPage, Rule, TriggerType};

/// Rules held in memory. `set_available(false)` simulates an outage.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<HashMap<Uuid, Rule>>,
    unavailable: AtomicBool,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.insert(rule);
        }
        store
    }

    /// Insert or fully replace a rule.
    pub fn insert(&self, rule: Rule) {
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.id, rule);
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory rule store marked offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn load_rule(&self, id: Uuid) -> Result<Option<Rule>, StoreError> {
        self.check_available()?;
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rules.get(&id).cloned())
    }

    async fn load_enabled_rules(
        &self,
        organization_id: Uuid,
        trigger_type: TriggerType,
    ) -> Result<Vec<Rule>, StoreError> {
        self.check_available()?;
        let rules = self.rules.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rules
            .values()
            .filter(|r| r.enabled && r.organization_id == organization_id && r.trigger_type == trigger_type)
            .cloned()
            .collect())
    }
}

/// Execution logs held in memory, in write order.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: RwLock<Vec<ExecutionLog>>,
    reject_writes: AtomicBool,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every log written so far, oldest first.
    pub fn all(&self) -> Vec<ExecutionLog> {
        self.logs.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.logs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make subsequent writes fail with `StoreError::Unavailable`.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExecutionLogStore for InMemoryLogStore {
    async fn write_log(&self, log: &ExecutionLog) -> Result<(), StoreError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory log store rejecting writes".into()));
        }
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(log.clone());
        Ok(())
    }

    async fn list_logs(&self, rule_id: Uuid, page: PageRequest) -> Result<LogPage, StoreError> {
        let page = page.normalized();
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<&ExecutionLog> = logs.iter().rev().filter(|l| l.rule_id == rule_id).collect();

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .iter()
            .skip(offset)
            .take(page.per_page as usize)
            .map(|l| (*l).clone())
            .collect();

        Ok(LogPage {
            items,
            page: page.page,
            per_page: page.per_page,
            total: matching.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AutomationGraph, ExecutionStatus, Node};
    use chrono::Utc;
    use serde_json::json;

    fn log_for(rule_id: Uuid, n: u64) -> ExecutionLog {
        ExecutionLog {
            id: Uuid::new_v4(),
            rule_id,
            trigger_event: json!({ "n": n }),
            status: ExecutionStatus::Success,
            error_message: None,
            duration_ms: n,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn logs_are_paged_newest_first() {
        let store = InMemoryLogStore::new();
        let rule = Uuid::new_v4();
        for n in 0..5 {
            store.write_log(&log_for(rule, n)).await.unwrap();
        }
        store.write_log(&log_for(Uuid::new_v4(), 99)).await.unwrap();

        let first = store.list_logs(rule, PageRequest::new(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.iter().map(|l| l.duration_ms).collect::<Vec<_>>(), vec![4, 3]);

        let last = store.list_logs(rule, PageRequest::new(3, 2)).await.unwrap();
        assert_eq!(last.items.iter().map(|l| l.duration_ms).collect::<Vec<_>>(), vec![0]);

        let past_end = store.list_logs(rule, PageRequest::new(9, 2)).await.unwrap();
        assert!(past_end.items.is_empty());
    }

    #[test]
    fn page_request_is_clamped() {
        let page = PageRequest::new(0, 10_000).normalized();
        assert_eq!(page, PageRequest::new(1, PageRequest::MAX_PER_PAGE));
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[tokio::test]
    async fn rule_store_filters_by_org_type_and_enabled() {
        let org = Uuid::new_v4();
        let graph = AutomationGraph::new().with_node("t", Node::trigger(TriggerType::TransactionCreated));
        let live = Rule::new(org, "live", TriggerType::TransactionCreated, graph.clone());
        let off = Rule::new(org, "off", TriggerType::TransactionCreated, graph.clone()).disabled();
        let other_org = Rule::new(Uuid::new_v4(), "other", TriggerType::TransactionCreated, graph.clone());
        let other_type = Rule::new(org, "webhook", TriggerType::WebhookReceived, graph);
        let store = InMemoryRuleStore::with_rules([live.clone(), off.clone(), other_org, other_type]);

        let loaded = store.load_enabled_rules(org, TriggerType::TransactionCreated).await.unwrap();
        assert_eq!(loaded, vec![live]);
        assert_eq!(store.load_rule(off.id).await.unwrap(), Some(off));

        store.set_available(false);
        assert!(matches!(
            store.load_enabled_rules(org, TriggerType::TransactionCreated).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
