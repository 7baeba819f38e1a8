//! repliscaled — the replica scaling daemon.
//!
//! Single binary that polls a managed application's status endpoint
//! and steers its replica count toward a target CPU utilization.
//!
//! # Usage
//!
//! ```text
//! repliscaled --host 10.0.0.5 --port 8123 --target-cpu-usage 0.8
//! ```
//!
//! SIGTERM and Ctrl-C request a graceful stop; the loop finishes its
//! current iteration (including any retries in flight) before the
//! process exits.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;

use repliscale_client::ClientConfig;
use repliscale_scaler::{Scaler, ScalerConfig};

#[derive(Debug, Parser)]
#[command(name = "repliscaled", about = "CPU-driven replica scaling daemon", version)]
struct Cli {
    /// Target CPU usage to maintain, as a fraction.
    #[arg(long, default_value_t = 0.80)]
    target_cpu_usage: f64,

    /// Seconds between polling cycles.
    #[arg(long, default_value_t = 15)]
    polling_interval: u64,

    /// Attempts per request before giving up.
    #[arg(long, default_value_t = 6)]
    retry_count: u32,

    /// Backoff base in seconds; the n-th retry waits base^n.
    #[arg(long, default_value_t = 2)]
    retry_delay: u64,

    /// Host of the managed application: an IPv4/IPv6 literal,
    /// "localhost", or "host.docker.internal".
    #[arg(long, default_value = "localhost", value_parser = parse_host)]
    host: String,

    /// Port of the managed application.
    #[arg(short, long, default_value_t = 8123,
          value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Talk to the application over HTTPS.
    #[arg(long)]
    https: bool,
}

fn parse_host(s: &str) -> Result<String, String> {
    if s == "localhost" || s == "host.docker.internal" || s.parse::<IpAddr>().is_ok() {
        Ok(s.to_string())
    } else {
        Err(format!(
            "invalid host {s:?}: expected an IP literal, \"localhost\", or \"host.docker.internal\""
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,repliscale=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let started = Instant::now();

    info!(
        host = %cli.host,
        port = cli.port,
        https = cli.https,
        target_cpu = cli.target_cpu_usage,
        "repliscaled starting"
    );

    let config = ScalerConfig {
        target_cpu_usage: cli.target_cpu_usage,
        polling_interval: Duration::from_secs(cli.polling_interval),
        client: ClientConfig {
            host: cli.host,
            port: cli.port,
            use_https: cli.https,
            retry_count: cli.retry_count,
            retry_delay: cli.retry_delay,
        },
    };

    let scaler = Scaler::new(config)?;
    let stop = scaler.stop_handle();

    // Request a stop on SIGTERM or Ctrl-C; the loop finishes its
    // current iteration before exiting.
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping scaler");
        stop.request_stop();
    });

    scaler.run().await;

    info!(
        uptime_secs = started.elapsed().as_secs(),
        "repliscaled stopped"
    );
    Ok(())
}

/// Resolves when the process receives SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
