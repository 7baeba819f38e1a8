//! The application transport client.
//!
//! Performs the two control-plane requests against the managed
//! application and hides transient failures behind a bounded retry
//! policy. Both operations share the same policy: up to `retry_count`
//! attempts, `retry_delay^attempt` seconds of backoff between them,
//! and a fixed per-attempt timeout.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::ClientError;

/// Per-attempt request timeout, independent of backoff.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection and retry parameters for the managed application.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host of the application. An IP literal or resolvable name.
    pub host: String,
    /// Port the application listens on.
    pub port: u16,
    /// Use HTTPS instead of HTTP.
    pub use_https: bool,
    /// Maximum attempts per operation.
    pub retry_count: u32,
    /// Backoff base in seconds; the n-th retry waits `retry_delay^n`.
    pub retry_delay: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8123,
            use_https: false,
            retry_count: 6,
            retry_delay: 2,
        }
    }
}

/// One successful status read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    /// High-priority CPU utilization as a fraction of capacity.
    pub cpu: f64,
    /// Replica count the application currently reports.
    pub replicas: u32,
}

/// Wire format of `GET /app/status`.
#[derive(Debug, Deserialize)]
struct StatusBody {
    cpu: CpuUsage,
    replicas: u32,
}

#[derive(Debug, Deserialize)]
struct CpuUsage {
    #[serde(rename = "highPriority")]
    high_priority: f64,
}

/// Wire format of `PUT /app/replicas`.
#[derive(Debug, Serialize)]
struct ReplicasBody {
    replicas: u32,
}

/// HTTP client for the managed application's control endpoints.
pub struct AppClient {
    http: reqwest::Client,
    base_url: String,
    retry_count: u32,
    retry_delay: u64,
}

impl AppClient {
    /// Build a client from connection parameters.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url(config),
            retry_count: config.retry_count,
            retry_delay: config.retry_delay,
        })
    }

    /// Read the application's current status.
    ///
    /// Success is HTTP 200 with a parseable body. Returns `None` once
    /// every attempt is spent; the caller skips its cycle rather than
    /// treating a missed read as fatal.
    pub async fn fetch_status(&self) -> Option<StatusSnapshot> {
        let url = format!("{}/app/status", self.base_url);

        for attempt in 1..=self.retry_count {
            match self.try_fetch_status(&url).await {
                Ok(snapshot) => return Some(snapshot),
                Err(e) => self.backoff("GET", &e, attempt).await,
            }
        }

        warn!(
            %url,
            attempts = self.retry_count,
            "status read failed, skipping this cycle"
        );
        None
    }

    async fn try_fetch_status(&self, url: &str) -> Result<StatusSnapshot, ClientError> {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status,
                body: body.trim().to_string(),
            });
        }

        let text = resp.text().await?;
        let body: StatusBody =
            serde_json::from_str(&text).map_err(ClientError::MalformedBody)?;

        Ok(StatusSnapshot {
            cpu: body.cpu.high_priority,
            replicas: body.replicas,
        })
    }

    /// Write a new replica count.
    ///
    /// The application acknowledges with 204 No Content. Returns whether
    /// the write was acknowledged; an exhausted write gives up without
    /// escalating, the next poll observes whether it took effect.
    pub async fn set_replicas(&self, count: u32) -> bool {
        let url = format!("{}/app/replicas", self.base_url);

        for attempt in 1..=self.retry_count {
            match self.try_set_replicas(&url, count).await {
                Ok(()) => {
                    debug!(replicas = count, "replica count acknowledged");
                    return true;
                }
                Err(e) => self.backoff("PUT", &e, attempt).await,
            }
        }

        warn!(
            %url,
            replicas = count,
            attempts = self.retry_count,
            "replica write failed, giving up"
        );
        false
    }

    async fn try_set_replicas(&self, url: &str, count: u32) -> Result<(), ClientError> {
        let resp = self
            .http
            .put(url)
            .json(&ReplicasBody { replicas: count })
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::NO_CONTENT {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus {
                status,
                body: body.trim().to_string(),
            });
        }

        Ok(())
    }

    /// Log a failed attempt and, if any attempts remain, sleep out the
    /// backoff before the next one.
    async fn backoff(&self, verb: &str, err: &ClientError, attempt: u32) {
        let delay = backoff_delay(self.retry_delay, attempt);
        error!(
            verb,
            error = %err,
            retry_in_secs = delay.as_secs(),
            attempt,
            "request attempt failed"
        );

        if attempt < self.retry_count {
            tokio::time::sleep(delay).await;
        }
    }
}

fn base_url(config: &ClientConfig) -> String {
    let scheme = if config.use_https { "https" } else { "http" };
    // IPv6 literals need brackets in the authority.
    if config.host.parse::<std::net::Ipv6Addr>().is_ok() {
        format!("{scheme}://[{}]:{}", config.host, config.port)
    } else {
        format!("{scheme}://{}:{}", config.host, config.port)
    }
}

/// Backoff before the n-th retry: `retry_delay^n` seconds.
///
/// The base itself is exponentiated, not multiplied by a power of two.
/// With base 2 the delays run 2s, 4s, 8s, 16s, 32s.
fn backoff_delay(base: u64, attempt: u32) -> Duration {
    Duration::from_secs(base.saturating_pow(attempt))
}
