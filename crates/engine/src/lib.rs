//! `engine` crate — rule models, graph validation, condition evaluation and
//! the execution engine that turns events into execution logs.

pub mod models;
pub mod error;
pub mod dag;
pub mod condition;
pub mod context;
pub mod config;
pub mod registry;
pub mod executor;
pub mod lock;
pub mod store;
pub mod recorder;
pub mod rule_engine;
pub mod dispatcher;
pub mod manual;
pub mod worker;

pub use config::EngineConfig;
pub use context::{EventContext, Invocation};
pub use dag::{validate_graph, validate_rule};
pub use error::{EngineError, StoreError, ValidationError};
pub use executor::{NodeOutcome, RuleExecutor, TraversalReport};
pub use models::{AutomationGraph, Event, ExecutionLog, ExecutionStatus, LogPage, Node, Rule, TriggerType};
pub use registry::ActionRegistry;
pub use rule_engine::RuleEngine;
pub use store::{ExecutionLogStore, PageRequest, RuleStore};
pub use worker::EventWorkerPool;
