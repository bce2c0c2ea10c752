use anyhow::Result;
use clap::Parser;
use pictura_cli::{connect_records, init_tracing, render_uploads};

#[derive(Parser, Debug)]
#[command(name = "list_uploads")]
#[command(about = "List finalized uploads, newest first")]
struct Args {
    /// Output format: json or table (default: table)
    #[arg(long, default_value = "table")]
    format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let records = connect_records().await?;
    println!("{}", render_uploads(&records, &args.format).await?);
    Ok(())
}
