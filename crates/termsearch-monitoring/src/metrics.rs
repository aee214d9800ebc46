//! Search and ingestion metrics.
//!
//! Recorded through the `metrics` facade; without an installed recorder the
//! calls are no-ops, so libraries can record unconditionally.

use tracing::info;

/// Counter of answered searches, labelled by the path that served them
pub const SERVED_TOTAL: &str = "termsearch_served_total";
/// Counter of searches that ended in an error, labelled by error class
pub const FAILED_TOTAL: &str = "termsearch_failed_total";
/// Histogram of end-to-end search latency in milliseconds
pub const SEARCH_DURATION_MS: &str = "termsearch_search_duration_ms";
/// Gauge of records written by the last corpus rebuild
pub const CORPUS_RECORDS: &str = "termsearch_corpus_records";

/// Term search specific metrics
pub struct SearchMetrics;

impl SearchMetrics {
    /// Record a search answered via `path` ("indexed" or "fallback")
    pub fn record_served(path: &'static str, duration_ms: f64, result_count: usize) {
        metrics::increment_counter!(SERVED_TOTAL, "path" => path);
        metrics::histogram!(SEARCH_DURATION_MS, duration_ms, "path" => path);
        tracing::debug!(path, duration_ms, result_count, "Search served");
    }

    /// Record a search that failed with an error of the given class
    pub fn record_failure(class: &'static str) {
        metrics::increment_counter!(FAILED_TOTAL, "class" => class);
    }

    /// Record a completed corpus rebuild
    pub fn record_corpus_rebuild(records: usize, duration_ms: f64) {
        metrics::gauge!(CORPUS_RECORDS, records as f64);
        info!("Corpus rebuild: records={}, duration={}ms", records, duration_ms);
    }
}

/// Install the Prometheus exporter with an HTTP scrape endpoint.
///
/// Must be called from within a Tokio runtime.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(listen_addr: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: std::net::SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("Invalid metrics listen address: {}", listen_addr))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
