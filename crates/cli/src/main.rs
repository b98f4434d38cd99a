//! `ledger-automation` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server and the event worker pool.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a rule definition JSON file.
//! - `run`      — dispatch one event against rules from a file, offline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use engine::store::{InMemoryLogStore, InMemoryRuleStore, PostgresLogStore, PostgresRuleStore};
use engine::{ActionRegistry, EngineConfig, Event, EventWorkerPool, Rule, RuleEngine};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ledger-automation",
    about = "Automation rule engine for finance dashboards",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server backed by Postgres.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[command(flatten)]
        database: DatabaseArgs,
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Run pending database migrations.
    Migrate {
        #[command(flatten)]
        database: DatabaseArgs,
    },
    /// Validate a rule definition JSON file.
    Validate {
        /// Path to the rule JSON file.
        path: PathBuf,
    },
    /// Dispatch one event against a rules file with logging-only handlers.
    Run {
        /// JSON array of rules.
        #[arg(long)]
        rules: PathBuf,
        /// JSON event: `{ "triggerType", "organizationId", "payload" }`.
        #[arg(long)]
        event: PathBuf,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args)]
struct DatabaseArgs {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,
}

#[derive(Args)]
struct EngineArgs {
    /// Per-call action handler timeout, in milliseconds.
    #[arg(long, env = "ACTION_TIMEOUT_MS", default_value_t = 10_000)]
    action_timeout_ms: u64,
    /// Tasks draining the event queue.
    #[arg(long, env = "DISPATCH_WORKERS", default_value_t = 4)]
    workers: usize,
    /// Events buffered before enqueue blocks.
    #[arg(long, env = "EVENT_QUEUE_CAPACITY", default_value_t = 256)]
    queue_capacity: usize,
}

impl From<&EngineArgs> for EngineConfig {
    fn from(args: &EngineArgs) -> Self {
        EngineConfig {
            action_timeout: Duration::from_millis(args.action_timeout_ms),
            workers: args.workers,
            queue_capacity: args.queue_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database, engine } => serve(&bind, &database, &EngineConfig::from(&engine)).await,
        Command::Migrate { database } => {
            let pool = connect(&database).await?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
            Ok(())
        }
        Command::Validate { path } => validate(&path),
        Command::Run { rules, event, engine } => run(&rules, &event, &EngineConfig::from(&engine)).await,
    }
}

async fn connect(database: &DatabaseArgs) -> Result<db::DbPool> {
    db::pool::create_pool(&database.database_url, database.max_connections, Duration::from_secs(5))
        .await
        .context("failed to connect to database")
}

async fn serve(bind: &str, database: &DatabaseArgs, config: &EngineConfig) -> Result<()> {
    let pool = connect(database).await?;
    let engine = RuleEngine::new(
        Arc::new(PostgresRuleStore::new(pool.clone())),
        Arc::new(PostgresLogStore::new(pool)),
        ActionRegistry::dry_run(),
        config,
    );
    let workers = Arc::new(EventWorkerPool::spawn(engine.clone(), config.workers, config.queue_capacity));

    info!("Starting API server on {bind}");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };
    api::serve(bind, api::AppState::new(engine, Arc::clone(&workers)), shutdown)
        .await
        .context("API server failed")?;

    workers.shutdown().await;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    let rule: Rule = read_json(path)?;
    match engine::validate_rule(&rule) {
        Ok(order) => {
            println!("✅ Rule '{}' is valid. Evaluation order: {order:?}", rule.name);
            Ok(())
        }
        Err(e) => bail!("❌ Validation failed: {e}"),
    }
}

async fn run(rules_path: &Path, event_path: &Path, config: &EngineConfig) -> Result<()> {
    let rules: Vec<Rule> = read_json(rules_path)?;
    let event: Event = read_json(event_path)?;

    let logs = Arc::new(InMemoryLogStore::new());
    let engine = RuleEngine::new(
        Arc::new(InMemoryRuleStore::with_rules(rules)),
        logs,
        ActionRegistry::dry_run(),
        config,
    );

    let results = engine.dispatch(&event).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
