use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use queuectl_core::{Job, JobQueue, QueueConfig, QueueCounts, observability};

/// Durable shell-command job queue
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding jobs.json and config.json
    #[arg(long, env = "QUEUECTL_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a shell command to the queue
    Enqueue {
        /// Command line run through the host shell
        job_name: String,
    },
    /// Worker management
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Show job counts and active jobs
    Status {
        /// Print the counts and jobs as JSON
        #[arg(long)]
        json: bool,
    },
    /// List jobs in the dead letter queue
    Dlq,
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Run workers in this process until Ctrl-C
    Start {
        /// Number of concurrent workers
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        count: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init();

    let config = QueueConfig::load(&cli.data_dir)
        .with_context(|| format!("loading config from {}", cli.data_dir.display()))?;
    let queue = JobQueue::open(&config)
        .await
        .with_context(|| format!("opening job store {}", config.store_path.display()))?;

    match cli.command {
        Command::Enqueue { job_name } => {
            let job = queue.enqueue(&job_name).await?;
            println!("{}", job.id);
        }
        Command::Worker {
            action: WorkerAction::Start { count },
        } => {
            let group = queue.start_worker(usize::from(count))?;
            info!(workers = count, store = %config.store_path.display(), "workers running, press Ctrl-C to stop");

            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            info!("shutdown requested, finishing in-flight jobs");
            group.shutdown_and_join().await;
            info!("all workers stopped");
        }
        Command::Status { json } => {
            let active = queue.list_active().await?;
            let dead = queue.list_dead().await?;
            let counts = QueueCounts::tally(&active, &dead);

            if json {
                let doc = serde_json::json!({ "counts": counts, "jobs": active });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!(
                    "pending: {}  processing: {}  completed: {}  dead: {}",
                    counts.pending, counts.processing, counts.completed, counts.dead
                );
                for job in &active {
                    println!("{}", job_line(job));
                }
            }
        }
        Command::Dlq => {
            let dead = queue.list_dead().await?;
            if dead.is_empty() {
                println!("dead letter queue is empty");
            }
            for job in &dead {
                println!("{}", job_line(job));
            }
        }
    }

    Ok(())
}

fn job_line(job: &Job) -> String {
    format!(
        "{}  {:<10}  {}/{}  {}  {}",
        job.id,
        job.state,
        job.attempts,
        job.max_attempts(),
        job.updated_at.to_rfc3339(),
        job.command
    )
}
