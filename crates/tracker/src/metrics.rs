//! Prometheus metrics exporter.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Histogram buckets for rule evaluation time, in seconds.
const EVALUATION_BUCKETS: &[f64] = &[
    0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// Installs the global recorder and serves `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime, once, before any metric is recorded.
pub fn init_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(EVALUATION_BUCKETS)?
        .install()?;

    tracing::info!(listen_addr = %addr, "Prometheus exporter listening");
    Ok(())
}
