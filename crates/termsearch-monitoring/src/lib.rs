//! Logging and metrics for the term search engine.

use serde::{Deserialize, Serialize};

pub mod logging;
pub mod metrics;

/// Configuration for initializing logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,termsearch_kb=debug"), overridden by RUST_LOG
    pub log_filter: String,
    /// Emit JSON lines instead of the pretty development format
    pub enable_json_logging: bool,
    /// Optional log file, rotated daily
    pub log_file: Option<String>,
    /// Address for the Prometheus scrape endpoint, e.g. "0.0.0.0:9000"
    pub metrics_listen_addr: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "termsearch".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
            metrics_listen_addr: None,
        }
    }
}

// Exported types
pub use crate::logging::{init_logging, LogExt};
pub use crate::metrics::SearchMetrics;
