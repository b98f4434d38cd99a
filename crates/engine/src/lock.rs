//! Per-rule mutual exclusion.
//!
//! Automatic dispatch and manual triggers share one `RuleLocks`, so two
//! traversals of the same rule never overlap (unless every handler in the
//! rule is idempotent, in which case callers skip the lock).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slots = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

/// Registry of one async mutex per rule ID, created on demand.
#[derive(Debug, Clone, Default)]
pub struct RuleLocks {
    slots: Slots,
}

/// Held for the duration of one traversal. Dropping it lets the next waiter in.
#[derive(Debug)]
pub struct RuleGuard {
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other traversal of `rule_id` is running.
    pub async fn acquire(&self, rule_id: Uuid) -> RuleGuard {
        let lock = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            sweep(&mut slots);
            Arc::clone(slots.entry(rule_id).or_default())
        };
        let guard = lock.lock_owned().await;

        RuleGuard {
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of rules with a live lock slot.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop slots only the map still references: no holder, no live waiter.
/// Waiters whose `acquire` was cancelled have already released theirs.
fn sweep(slots: &mut HashMap<Uuid, Arc<AsyncMutex<()>>>) {
    slots.retain(|_, lock| Arc::strong_count(lock) > 1);
}

impl Drop for RuleGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        sweep(&mut slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_rule_is_serialised() {
        let locks = RuleLocks::new();
        let rule = Uuid::new_v4();

        let first = locks.acquire(rule).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(rule).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let second = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should get the lock")
            .unwrap();
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_does_not_leak_its_slot() {
        let locks = RuleLocks::new();
        let rule = Uuid::new_v4();

        let holder = locks.acquire(rule).await;
        let gave_up = tokio::time::timeout(Duration::from_millis(10), locks.acquire(rule)).await;
        assert!(gave_up.is_err());

        drop(holder);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_rules_do_not_block_each_other() {
        let locks = RuleLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
