//! Error types for the transport client.

use thiserror::Error;

/// A single failed request attempt.
///
/// These never escape the client's retry loop; they exist so each
/// attempt can be logged with the reason it failed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed status body: {0}")]
    MalformedBody(#[source] serde_json::Error),
}
