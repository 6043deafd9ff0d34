//! Binary runner utilities
//!
//! Startup / shutdown banners and the Ctrl+C wait shared by binaries.

use std::time::Duration;
use tracing::{info, warn};

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// How often the binary reports its status
    pub report_interval: Duration,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            report_interval: Duration::from_secs(5),
        }
    }

    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }
}

/// Print startup banner
pub fn print_banner(config: &RunConfig, details: &[String]) {
    info!("");
    info!("========================================");
    info!("Starting {}", config.name);
    for line in details {
        info!("{}", line);
    }
    info!("Press Ctrl+C to stop");
    info!("========================================");
    info!("");
}

/// Print shutdown banner
pub fn print_shutdown(name: &str, stats: Option<&str>) {
    info!("");
    info!("========================================");
    info!("{} stopped gracefully", name);
    if let Some(stats) = stats {
        info!("{}", stats);
    }
    info!("========================================");
}

/// Resolves on Ctrl+C
///
/// If the signal handler cannot be installed the error is logged and the
/// future never resolves, leaving the binary to be stopped externally.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_builder() {
        let config = RunConfig::new("live_monitor").with_report_interval(Duration::from_secs(10));
        assert_eq!(config.name, "live_monitor");
        assert_eq!(config.report_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::new("default");
        assert_eq!(config.report_interval, Duration::from_secs(5));
    }
}
