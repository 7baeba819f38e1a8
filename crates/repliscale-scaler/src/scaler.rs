//! The scaling loop.
//!
//! One `Scaler` owns its configuration, a transport client, and the
//! stop channel. `run()` drives iterations until a stop is requested
//! or, in run-once mode, after a single iteration.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use repliscale_client::{AppClient, StatusSnapshot};

use crate::config::ScalerConfig;

/// Outcome of evaluating one status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Write the given replica count back to the application.
    ScaleTo(u32),
    /// The count already matches the decision rule.
    NoChange,
}

/// Requests a stop from another task, typically a signal handler.
///
/// Cheap to clone. `request_stop` is idempotent; the first call wins
/// and later calls are no-ops.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Ask the loop to stop after its current iteration.
    pub fn request_stop(&self) {
        let _ = self.tx.send(true);
    }
}

/// The scaling loop: polls status, applies the decision rule, writes
/// the adjusted replica count back.
pub struct Scaler {
    config: ScalerConfig,
    client: AppClient,
    /// One iteration then stop. Deterministic runs for tests.
    run_once: bool,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Scaler {
    /// Create a scaler from its configuration.
    pub fn new(config: ScalerConfig) -> anyhow::Result<Self> {
        let client = AppClient::new(&config.client)?;
        let (stop_tx, stop_rx) = watch::channel(false);

        Ok(Self {
            config,
            client,
            run_once: false,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        })
    }

    /// Enable or disable run-once mode.
    pub fn with_run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    /// Handle for requesting a stop from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Apply the decision rule to one snapshot.
    ///
    /// Three strict comparisons against the target, kept as independent
    /// checks. Scaling down floors at one replica; scaling up is an
    /// unbounded unit step.
    pub fn decide(&self, status: &StatusSnapshot) -> ScaleDecision {
        let target = self.config.target_cpu_usage;
        let mut new_replicas = status.replicas;

        if status.cpu < target {
            new_replicas = status.replicas.saturating_sub(1).max(1);
        }
        if status.cpu > target {
            new_replicas = status.replicas.saturating_add(1);
        }

        if new_replicas == status.replicas {
            ScaleDecision::NoChange
        } else {
            ScaleDecision::ScaleTo(new_replicas)
        }
    }

    /// Drive the loop until stopped.
    ///
    /// Each iteration completes fully before the stop signal is
    /// re-evaluated; a stop request never cancels an in-flight read,
    /// write, or backoff. The sleep between iterations does wake early
    /// on a stop request so shutdown is not delayed by a long polling
    /// interval.
    pub async fn run(mut self) {
        info!(
            target_cpu = self.config.target_cpu_usage,
            interval_secs = self.config.polling_interval.as_secs(),
            "scaler started"
        );

        while !*self.stop_rx.borrow() {
            self.poll_once().await;

            if self.run_once {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.polling_interval) => {}
                _ = self.stop_rx.changed() => {}
            }
        }

        info!("scaler stopped");
    }

    /// One polling cycle: read status, decide, write back on change.
    async fn poll_once(&self) {
        let Some(status) = self.client.fetch_status().await else {
            debug!("no status this cycle, skipping adjustment");
            return;
        };

        let decision = self.decide(&status);
        let new_replicas = match decision {
            ScaleDecision::ScaleTo(n) => n,
            ScaleDecision::NoChange => status.replicas,
        };

        info!(
            cpu = status.cpu,
            replicas = status.replicas,
            new_replicas,
            "poll complete"
        );

        if let ScaleDecision::ScaleTo(n) = decision {
            // Fire and forget: the next poll observes whether it took.
            self.client.set_replicas(n).await;
        }
    }
}
