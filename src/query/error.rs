//! Error types for query execution.

use thiserror::Error;

use crate::error::ProtocolViolation;
use crate::transport::TransportError;

/// Why a query run or save did not produce a result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The upstream could not be reached or did not answer in time.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The upstream answered in an unexpected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// The query service rejected the query itself.
    #[error("{message}")]
    Upstream {
        /// Error text returned by the query service.
        message: String,
    },

    /// The query service demands an interactive captcha.
    #[error(
        "the query service requires a captcha\n  Suggestion: Run a query once interactively in a browser, then authenticate again"
    )]
    CaptchaRequired,

    /// The job did not finish before the polling deadline.
    #[error(
        "query job {job_id} did not finish within {waited_ms} ms\n  Suggestion: The job keeps running upstream; retry the request later"
    )]
    PollTimeout {
        /// The job that was being polled.
        job_id: String,
        /// Time waited since submission.
        waited_ms: u128,
    },
}

impl QueryError {
    /// Creates an `Upstream` error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}
