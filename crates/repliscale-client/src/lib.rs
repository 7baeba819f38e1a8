//! repliscale-client — HTTP transport for the managed application.
//!
//! Wraps the application's two control endpoints behind a bounded
//! retry policy:
//!
//! ```text
//! AppClient
//!   ├── fetch_status()   GET  /app/status    → Option<StatusSnapshot>
//!   └── set_replicas(n)  PUT  /app/replicas  → bool (acknowledged)
//! ```
//!
//! Transient failures (non-success status, connection errors, timeouts,
//! malformed bodies) are retried with `retry_delay^attempt` backoff.
//! Once every attempt is spent, `fetch_status` returns `None` and
//! `set_replicas` returns `false`; neither surfaces a hard error, the
//! caller decides what a missed read or write means for its cycle.

pub mod client;
pub mod error;

pub use client::{AppClient, ClientConfig, StatusSnapshot};
pub use error::ClientError;
