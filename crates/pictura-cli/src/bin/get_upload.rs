use anyhow::Result;
use clap::Parser;
use pictura_cli::{connect_records, init_tracing, render_upload};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "get_upload")]
#[command(about = "Show one finalized upload by id")]
struct Args {
    /// Upload ID
    id: Uuid,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let records = connect_records().await?;
    println!("{}", render_upload(&records, args.id).await?);
    Ok(())
}
