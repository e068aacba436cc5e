//! Error types for the VPC discovery service.
//!
//! Each collaborator boundary has its own error enum so callers can decide
//! which failures degrade gracefully and which surface to the client.

use thiserror::Error;

/// Invalid process configuration, detected once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting could not be parsed.
    #[error("invalid value {value:?} for {name}: {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Failures talking to the key-value cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Error returned by the Redis client or server.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Cached payload could not be encoded or decoded.
    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// The backend did not answer within the configured timeout.
    #[error("cache operation timed out")]
    Timeout,
}

/// Failures talking to the Compute Engine inventory API.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Transport-level failure.
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("compute API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The configured endpoint does not form a valid URL.
    #[error("invalid compute API URL: {0}")]
    InvalidUrl(String),

    /// No usable access token could be obtained.
    #[error("access token unavailable: {0}")]
    Token(String),
}

/// Unexpected failure while serving a discovery request.
///
/// Everything here is converted into a structured 500 response by the
/// discovery handler.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The report task panicked or was cancelled.
    #[error("report generation failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
