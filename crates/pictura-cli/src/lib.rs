use anyhow::Context;
use pictura_core::{DatabaseConfig, UploadRecord};
use pictura_db::{setup_database, UploadRepository};
use pictura_processing::RecordWriter;
use std::fmt::Write;
use std::sync::Arc;
use uuid::Uuid;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Open the upload read path from `DATABASE_URL` (a `.env` file is honored).
///
/// The CLI only reads a handful of rows, so it keeps a small pool.
pub async fn connect_records() -> anyhow::Result<RecordWriter> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = setup_database(&DatabaseConfig {
        url,
        max_connections: 2,
        timeout_seconds: 10,
    })
    .await?;
    Ok(RecordWriter::new(Arc::new(UploadRepository::new(pool))))
}

/// One upload as pretty JSON. An unknown id is an error.
pub async fn render_upload(records: &RecordWriter, id: Uuid) -> anyhow::Result<String> {
    let record = records.get_by_id(id).await?;
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Every upload, as `json` or (any other format) a table.
pub async fn render_uploads(records: &RecordWriter, format: &str) -> anyhow::Result<String> {
    let uploads = records.list_all().await?;
    match format {
        "json" => Ok(serde_json::to_string_pretty(&uploads)?),
        _ => Ok(format_upload_table(&uploads)),
    }
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Records as a fixed-width table.
pub fn format_upload_table(records: &[UploadRecord]) -> String {
    if records.is_empty() {
        return "No uploads found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36} {:<24} {:<12} {:>10} {:>6} {:>20}",
        "ID", "Filename", "Type", "Size (KB)", "Thumbs", "Uploaded At"
    );
    let _ = writeln!(out, "{}", "-".repeat(113));

    for record in records {
        let _ = writeln!(
            out,
            "{:<36} {:<24} {:<12} {:>10.1} {:>6} {:>20}",
            record.id,
            truncate_string(&record.filename, 24),
            truncate_string(&record.mime_type, 12),
            record.size as f64 / 1024.0,
            record.thumbnails.len(),
            record.uploaded_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let _ = write!(out, "\n{} upload(s)", records.len());
    out
}
