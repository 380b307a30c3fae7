//! Query execution against the data explorer on behalf of an authenticated caller.
//!
//! A run or save is one form POST carrying the caller's session cookie. The
//! service either answers with the finished payload or with a `job_id` that
//! [`JobPoller`] then drives to completion.
//!
//! # Architecture
//!
//! - [`QueryClient`] - Submits run/save calls and decides whether to poll
//! - [`JobPoller`] / [`PollPolicy`] - Deadline-bounded status polling
//! - [`QueryJob`] - Interpreted status payload
//! - [`QueryError`] - Why a run or save produced no result

mod error;
mod job;
mod poller;

pub use error::QueryError;
pub use job::{JobId, JobStatus, QueryJob};
pub use poller::{DEFAULT_POLL_BUDGET, DEFAULT_POLL_INTERVAL, JobPoller, PollPolicy};

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::endpoints::Endpoints;
use crate::error::ProtocolViolation;
use crate::transport::{HttpRequest, Transport};

/// The revision a save produced, surfaced as `{"revisionId": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedRevision {
    /// Revision id as reported upstream (string or number).
    #[serde(rename = "revisionId")]
    pub revision_id: Value,
}

/// Runs and saves queries, polling asynchronous jobs when needed.
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    poller: JobPoller,
}

impl QueryClient {
    /// Creates a client over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints, policy: PollPolicy) -> Self {
        let poller = JobPoller::new(Arc::clone(&transport), endpoints.clone(), policy);
        Self {
            transport,
            endpoints,
            poller,
        }
    }

    /// Runs revision `revision_id` of a query; `params` is forwarded verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] from submission or polling.
    #[instrument(skip(self, auth_cookie, params))]
    pub async fn run(
        &self,
        auth_cookie: &str,
        site_id: &str,
        query_id: &str,
        revision_id: &str,
        params: &str,
    ) -> Result<Value, QueryError> {
        let url = self.endpoints.run_query_url(site_id, query_id, revision_id);
        let job = self.submit(auth_cookie, url, params).await?;
        info!("query run completed");
        Ok(job.into_payload())
    }

    /// Saves a query and returns only the resulting revision.
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] from submission or polling, or a
    /// protocol violation when the finished payload lacks `revisionId`.
    #[instrument(skip(self, auth_cookie, params))]
    pub async fn save(
        &self,
        auth_cookie: &str,
        site_id: &str,
        query_id: &str,
        params: &str,
    ) -> Result<SavedRevision, QueryError> {
        let url = self.endpoints.save_query_url(site_id, query_id);
        let job = self.submit(auth_cookie, url.clone(), params).await?;
        let revision_id = job
            .status
            .revision_id
            .ok_or_else(|| ProtocolViolation::MissingField {
                field: "revisionId",
                url: url.to_string(),
            })?;
        info!(revision_id = %revision_id, "query saved");
        Ok(SavedRevision { revision_id })
    }

    async fn submit(&self, auth_cookie: &str, url: Url, params: &str) -> Result<QueryJob, QueryError> {
        let submitted_at = Instant::now();
        let request = HttpRequest::post_encoded(url.clone(), params).with_cookie(auth_cookie);
        debug!(url = %url, "submitting query");

        let response = self.transport.send(request).await?;
        let job = QueryJob::parse(&url, &response.body)?;
        if let Some(failure) = job.failure() {
            warn!(error = %failure, "query rejected on submission");
            return Err(failure);
        }

        match job.job_id() {
            None => Ok(job),
            Some(job_id) => {
                debug!(job_id = %job_id, "query executing asynchronously");
                self.poller
                    .await_completion(auth_cookie, job_id, submitted_at)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("endpoints", &self.endpoints)
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}
