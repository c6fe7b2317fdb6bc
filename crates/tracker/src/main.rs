use anyhow::{Context, Result};
use domain::services::BroadcastEventPublisher;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::broadcast;
use tracing::info;

use tracker::catalog::Catalog;
use tracker::config::Config;
use tracker::pipeline::{spawn_alert_listener, TelemetryPipeline};
use tracker::registry::VehicleRegistry;
use tracker::{logging, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    logging::init_logging(&config.logging)?;

    info!("Starting fleet tracker v{}", env!("CARGO_PKG_VERSION"));

    if config.metrics.enabled {
        metrics::init_metrics(config.metrics_addr()?)?;
    }

    let catalog = match &config.telemetry.catalog_path {
        Some(path) => Catalog::load(path)
            .await
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => {
            info!("No catalog configured, running without alert rules");
            Catalog::default()
        }
    };

    let publisher = Arc::new(BroadcastEventPublisher::new(
        config.engine.alert_channel_capacity,
    ));
    let registry = Arc::new(VehicleRegistry::new());
    let pipeline = TelemetryPipeline::new(
        catalog,
        Arc::clone(&registry),
        Arc::clone(&publisher),
        config.engine.failure_policy,
    );

    let listener = spawn_alert_listener(Arc::clone(&registry), pipeline.subscribe());
    let printer = spawn_alert_printer(pipeline.subscribe());

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if config.reads_stdin() {
        info!("Reading telemetry from standard input");
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        info!(source = %config.telemetry.source, "Reading telemetry from file");
        let file = tokio::fs::File::open(&config.telemetry.source)
            .await
            .with_context(|| format!("opening {}", config.telemetry.source))?;
        Box::new(BufReader::new(file))
    };

    let summary = pipeline.run(reader).await?;

    // Dropping the last publisher handles closes the alert channel.
    drop(pipeline);
    drop(publisher);
    let recorded = listener.await?;
    printer.await?;

    info!(
        processed = summary.processed,
        rejected = summary.rejected,
        alerts = summary.alerts,
        recorded = recorded,
        vehicles = registry.len(),
        "Fleet tracker finished"
    );

    Ok(())
}

/// Writes each alert to standard output as one JSON line.
fn spawn_alert_printer(
    mut receiver: broadcast::Receiver<domain::models::AlertEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize alert"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = skipped, "Alert printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
