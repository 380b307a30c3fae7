//! Status payload of a query run or save, possibly asynchronous.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::QueryError;
use crate::error::ProtocolViolation;

/// Identifier of an asynchronous job on the query service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    /// GUID-style identifier.
    Text(String),
    /// Numeric identifier.
    Number(u64),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(id) => f.write_str(id),
            Self::Number(id) => write!(f, "{id}"),
        }
    }
}

/// Fields of the payload that drive the polling state machine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobStatus {
    /// Whether the job is still executing.
    #[serde(default)]
    pub running: bool,
    /// Error reported for the query itself.
    #[serde(default)]
    pub error: Option<Value>,
    /// Set when the query service wants a captcha solved.
    #[serde(default)]
    pub captcha: Option<bool>,
    /// Present when the call is executing asynchronously.
    #[serde(default)]
    pub job_id: Option<JobId>,
    /// Revision created by a save.
    #[serde(default, rename = "revisionId")]
    pub revision_id: Option<Value>,
}

/// One status payload: the interpreted fields plus the raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryJob {
    /// Interpreted fields.
    pub status: JobStatus,
    /// The payload as received.
    pub payload: Value,
}

impl QueryJob {
    /// Parses a response body from `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::MalformedJson`] when the body is not a JSON
    /// object of the expected shape.
    pub fn parse(url: &Url, body: &str) -> Result<Self, ProtocolViolation> {
        let malformed = |reason: String| ProtocolViolation::MalformedJson {
            url: url.to_string(),
            reason,
        };
        let payload: Value = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
        let status = JobStatus::deserialize(&payload).map_err(|e| malformed(e.to_string()))?;
        Ok(Self { status, payload })
    }

    /// Returns the failure this payload reports, if any.
    #[must_use]
    pub fn failure(&self) -> Option<QueryError> {
        if let Some(error) = self.status.error.as_ref().and_then(error_message) {
            return Some(QueryError::upstream(error));
        }
        if self.status.captcha == Some(true) {
            return Some(QueryError::CaptchaRequired);
        }
        None
    }

    /// Returns the job id when the call is executing asynchronously.
    #[must_use]
    pub fn job_id(&self) -> Option<&JobId> {
        self.status.job_id.as_ref()
    }

    /// Whether the job is still executing.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status.running
    }

    /// Consumes the payload, returning the raw JSON.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.trim().is_empty() => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}
