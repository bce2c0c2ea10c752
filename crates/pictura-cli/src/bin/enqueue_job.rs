use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use pictura_cli::init_tracing;
use pictura_core::{Job, QueueConfig};
use pictura_worker::{JobQueue, SqsJobQueue};

#[derive(Parser, Debug)]
#[command(name = "enqueue_job")]
#[command(about = "Publish an ingestion job for an object already in temp storage")]
struct Args {
    /// Temp object key, e.g. temp/2024-01-01/abc-cat.jpg
    #[arg(long)]
    temp_key: String,

    /// Original filename
    #[arg(long)]
    filename: String,

    /// Declared MIME type
    #[arg(long, default_value = "image/jpeg")]
    mime_type: String,

    /// Declared size in bytes
    #[arg(long)]
    size: u64,

    #[arg(long, default_value = "")]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let queue_config = QueueConfig::from_env()?;
    queue_config.validate()?;
    let queue = SqsJobQueue::new(&queue_config)
        .await
        .context("Failed to initialize job queue")?;

    let job = Job {
        owner_first_name: args.first_name,
        owner_last_name: args.last_name,
        original_filename: args.filename,
        temp_key: args.temp_key,
        declared_mime_type: args.mime_type,
        declared_size: args.size,
        uploaded_at: Utc::now(),
    };
    // Reject what the worker would reject as malformed.
    Job::parse(job.to_payload()?.as_bytes())?;

    queue.publish(&job).await?;
    println!("Enqueued {}", job.temp_key);
    Ok(())
}
