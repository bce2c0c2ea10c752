use anyhow::Context;
use pictura_core::Config;
use pictura_service::setup::{self, server};
use pictura_service::{health, telemetry};
use tokio::sync::watch;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    config
        .validate()
        .context("Configuration validation failed")?;

    telemetry::init_telemetry(&config.log_format)?;
    tracing::info!(
        environment = %config.environment,
        concurrency = config.worker.concurrency,
        "Configuration loaded and validated successfully"
    );

    let app = setup::initialize_app(&config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer = tokio::spawn(app.consumer.run(shutdown_rx.clone()));
    let server = tokio::spawn(server::start_server(
        config.server_port,
        health::router(),
        shutdown_rx,
    ));

    server::shutdown_signal().await;
    tracing::info!("Shutting down gracefully...");
    let _ = shutdown_tx.send(true);

    consumer.await.context("Consumer task panicked")?;
    server.await.context("Health server task panicked")??;

    app.pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
