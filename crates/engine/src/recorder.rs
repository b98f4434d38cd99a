//! Execution log writer.
//!
//! `RuleRunner` is the single place where a rule evaluation turns into an
//! [`ExecutionLog`]: it takes the per-rule lock, times the traversal, derives
//! the record and appends it to the log store. Both the dispatcher and the
//! manual trigger gateway go through it, so every evaluation yields exactly
//! one log.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::error;
use uuid::Uuid;

use crate::context::EventContext;
use crate::dag::validate_rule;
use crate::executor::{RuleExecutor, TraversalReport};
use crate::lock::RuleLocks;
use crate::models::{ExecutionLog, Rule};
use crate::store::ExecutionLogStore;

/// Runs one rule and records the outcome.
#[derive(Clone)]
pub struct RuleRunner {
    executor: RuleExecutor,
    locks: RuleLocks,
    logs: Arc<dyn ExecutionLogStore>,
}

impl RuleRunner {
    pub fn new(executor: RuleExecutor, locks: RuleLocks, logs: Arc<dyn ExecutionLogStore>) -> Self {
        Self { executor, locks, logs }
    }

    /// Evaluate `rule` against `ctx` and persist exactly one log row.
    ///
    /// The evaluation runs on its own task: dropping the returned future
    /// (a disconnected HTTP client, a caller timeout) does not stop the
    /// traversal or lose its log. A rule that failed to decode or no longer
    /// validates is recorded as `failed` without touching any handler. A
    /// failed log write is reported but doesn't change the returned log.
    pub async fn run(&self, rule: &Rule, ctx: &EventContext) -> ExecutionLog {
        let runner = self.clone();
        let owned_rule = rule.clone();
        let owned_ctx = ctx.clone();
        let started = Instant::now();

        let handle = tokio::spawn(async move { runner.evaluate(&owned_rule, &owned_ctx).await });

        match handle.await {
            Ok(log) => log,
            Err(e) => {
                error!(rule_id = %rule.id, error = %e, "rule evaluation task aborted");
                let report = TraversalReport::rejected(rule, format!("evaluation aborted: {e}"));
                let log = new_log(rule, ctx, &report, started.elapsed());
                self.write(&log).await;
                log
            }
        }
    }

    async fn evaluate(&self, rule: &Rule, ctx: &EventContext) -> ExecutionLog {
        let _guard = if self.executor.requires_exclusive(rule) {
            Some(self.locks.acquire(rule.id).await)
        } else {
            None
        };

        let started = Instant::now();
        let report = if let Some(reason) = &rule.definition_error {
            TraversalReport::rejected(rule, format!("invalid rule definition: {reason}"))
        } else {
            match validate_rule(rule) {
                Ok(_) => self.executor.traverse(rule, ctx).await,
                Err(e) => {
                    error!(rule_id = %rule.id, error = %e, "stored rule failed validation, not executing");
                    TraversalReport::rejected(rule, format!("invalid rule graph: {e}"))
                }
            }
        };

        let log = new_log(rule, ctx, &report, started.elapsed());
        self.write(&log).await;
        log
    }

    async fn write(&self, log: &ExecutionLog) {
        if let Err(e) = self.logs.write_log(log).await {
            error!(rule_id = %log.rule_id, log_id = %log.id, error = %e, "failed to persist execution log");
        }
    }
}

fn new_log(rule: &Rule, ctx: &EventContext, report: &TraversalReport, elapsed: Duration) -> ExecutionLog {
    ExecutionLog {
        id: Uuid::new_v4(),
        rule_id: rule.id,
        trigger_event: ctx.payload.clone(),
        status: report.status,
        error_message: report.error_message.clone(),
        duration_ms: duration_ms(elapsed),
        created_at: Utc::now(),
    }
}

/// Whole milliseconds, rounded up: any evaluation that took time reports
/// at least 1ms.
fn duration_ms(elapsed: Duration) -> u64 {
    let ms = elapsed.as_nanos().div_ceil(1_000_000);
    u64::try_from(ms).unwrap_or(u64::MAX)
}
