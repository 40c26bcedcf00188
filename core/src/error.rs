//! Error types for the shared client and its configuration helpers.
//!
//! # Design
//! The fetcher is a pass-through: transport and decode failures reach the
//! caller as-is, wrapped only so they share one `FetchError` type. A
//! decoded envelope with `success: false` is data, never an error, so there
//! is no variant for it here.

use thiserror::Error;

/// A network round trip that could not complete.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, TLS handshake failure.
    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// The caller triggered the request's cancellation token.
    #[error("request aborted")]
    Aborted,

    /// Any other failure reported by the HTTP stack (body read, redirect loop).
    #[error("HTTP transport failed: {0}")]
    Http(#[source] reqwest::Error),

    /// Failure reported by a non-reqwest transport.
    #[error("transport failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err)
        } else {
            TransportError::Http(err)
        }
    }
}

/// Errors returned by `OrcaFetcher`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body was not valid JSON for the requested shape.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// A `Fetched` value was converted to the shape it was not fetched as.
    #[error("response was fetched {actual}, expected {expected}")]
    UnwrapMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors raised while reading required configuration from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {key} is required")]
    Missing { key: String },

    #[error("Environment variable {key} must be a number, got {value:?}")]
    NotNumeric { key: String, value: String },

    #[error("Environment variable {key} is invalid ({value:?}): {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}
