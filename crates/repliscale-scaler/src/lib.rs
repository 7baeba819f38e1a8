//! repliscale-scaler — CPU-driven replica scaling.
//!
//! Polls the managed application's status endpoint, compares the
//! reported CPU utilization against `ScalerConfig.target_cpu_usage`,
//! and steers the replica count with unit steps.
//!
//! # Scaling Algorithm
//!
//! ```text
//! current_cpu, current_replicas = GET /app/status
//!
//! if current_cpu < target:
//!     new_replicas = max(1, current_replicas - 1)
//!
//! if current_cpu > target:
//!     new_replicas = current_replicas + 1
//!
//! if new_replicas != current_replicas:
//!     PUT /app/replicas {"replicas": new_replicas}
//! ```
//!
//! The two comparisons are deliberately independent checks rather than
//! an if/else chain; they are mutually exclusive today, and the split
//! keeps the branch structure honest if a dead band is ever added.
//!
//! A missed read (transport retries exhausted) skips the adjustment for
//! that cycle. A missed write is fire-and-forget; the next poll
//! observes whether it took effect. The loop stops cooperatively via a
//! [`StopHandle`], completing its current iteration first.

pub mod config;
pub mod scaler;

pub use config::ScalerConfig;
pub use scaler::{ScaleDecision, Scaler, StopHandle};
