//! Scaler configuration.

use std::time::Duration;

use repliscale_client::ClientConfig;

/// Configuration for a scaler instance, assembled once at startup and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScalerConfig {
    /// CPU utilization fraction the loop steers toward.
    pub target_cpu_usage: f64,
    /// Delay between polling cycles.
    pub polling_interval: Duration,
    /// Connection and retry parameters for the managed application.
    pub client: ClientConfig,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            target_cpu_usage: 0.80,
            polling_interval: Duration::from_secs(15),
            client: ClientConfig::default(),
        }
    }
}
