//! `rusty-automation-tool` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`    — start the API server.
//! - `worker`   — start a queue worker.
//! - `migrate`  — run pending database migrations.
//! - `validate` — validate a flow JSON file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use engine::ExecutorConfig;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "rusty-automation-tool",
    about = "High-performance flow automation engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        #[arg(long, default_value = "./modules")]
        modules_dir: PathBuf,
        #[arg(long, default_value_t = 1000)]
        max_node_runs: u32,
    },
    /// Start a background worker that drains queued jobs.
    Worker {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        #[arg(long, default_value = "./modules")]
        modules_dir: PathBuf,
        #[arg(long, default_value_t = 1000)]
        max_node_runs: u32,
        /// How long to sleep between empty polls of the job queue.
        #[arg(long, default_value_t = 1000)]
        poll_interval_ms: u64,
    },
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a flow definition JSON file.
    Validate {
        /// Path to the flow JSON file.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind, database_url, modules_dir, max_node_runs } => {
            info!("Starting API server on {bind}");
            let pool = db::pool::create_pool(&database_url, 10)
                .await
                .expect("failed to connect to database");
            let config = ExecutorConfig { max_node_runs, ..Default::default() };
            api::serve(&bind, pool, modules_dir, config).await.unwrap();
        }
        Command::Worker { database_url, modules_dir, max_node_runs, poll_interval_ms } => {
            info!("Starting background worker");
            let pool = db::pool::create_pool(&database_url, 10)
                .await
                .expect("failed to connect to database");
            let config = ExecutorConfig { max_node_runs, ..Default::default() };
            let runtime = engine::bootstrap(pool, modules_dir, config)
                .await
                .expect("failed to bootstrap runtime");

            run_worker(runtime, Duration::from_millis(poll_interval_ms)).await;
        }
        Command::Migrate { database_url } => {
            info!("Running migrations against {database_url}");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .expect("failed to connect to database");
            db::pool::run_migrations(&pool)
                .await
                .expect("migration failed");
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let content = std::fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read file {}: {e}", path.display()));

            let flow: engine::Flow = serde_json::from_str(&content)
                .unwrap_or_else(|e| panic!("invalid JSON: {e}"));

            match engine::validate_flow(&flow) {
                Ok(()) => {
                    let bridge_groups = engine::build_bridge_groups(&flow);
                    let order = engine::compute_execution_order(&flow, &bridge_groups);
                    println!("Flow is valid. Execution order: {order:?}");
                }
                Err(e) => {
                    eprintln!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Poll `job_queue` for pending jobs and run each one to completion
/// through the Flow Runner, looping forever.
async fn run_worker(runtime: engine::Runtime, poll_interval: Duration) {
    loop {
        match db::repository::jobs::fetch_next_job(&runtime.pool).await {
            Ok(Some(job)) => {
                if let Err(e) = process_job(&runtime, &job).await {
                    error!(job_id = %job.id, error = %e, "job failed");
                    let _ = db::repository::jobs::fail_job(&runtime.pool, job.id, job.max_attempts).await;
                } else {
                    let _ = db::repository::jobs::complete_job(&runtime.pool, job.id).await;
                }
            }
            Ok(None) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                warn!(error = %e, "failed to poll job queue");
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

async fn process_job(runtime: &engine::Runtime, job: &db::models::JobRow) -> Result<(), String> {
    let row = db::repository::flows::get_flow(&runtime.pool, job.flow_id)
        .await
        .map_err(|e| e.to_string())?;
    let flow: engine::Flow = serde_json::from_value(row.definition).map_err(|e| e.to_string())?;

    let result = runtime
        .flow_runner
        .run(&flow, job.payload.clone(), None)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(error) = result.output.get("error").and_then(|v| v.as_str()) {
        return Err(error.to_string());
    }

    Ok(())
}
