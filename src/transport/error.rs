//! Error types for upstream transport operations.

use thiserror::Error;

/// Failures talking to the upstream services.
///
/// None of these are retried; they surface to the caller as-is.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error on {method} {url}: {source}")]
    Network {
        /// Request method.
        method: String,
        /// Target URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded the configured connect or read timeout.
    #[error("timeout on {method} {url}")]
    Timeout {
        /// Request method.
        method: String,
        /// Target URL.
        url: String,
    },

    /// The response body could not be read as text.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Target URL.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl TransportError {
    /// Classifies a `reqwest` send error.
    #[must_use]
    pub fn from_send(method: &str, url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                method: method.to_string(),
                url: url.to_string(),
            }
        } else {
            Self::Network {
                method: method.to_string(),
                url: url.to_string(),
                source,
            }
        }
    }
}
