//! Polls an asynchronous query job until it finishes or the deadline passes.
//!
//! States: submitted, polling, then completed or timed out. Each poll is a
//! cache-busted re-fetch of the job status, so a poll carries no state of its
//! own. Only the wall-clock budget bounds the loop; there is no retry count.
//! Dropping the future stops polling; the upstream job itself has no cancel
//! endpoint and keeps running.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, instrument, warn};

use super::job::{JobId, QueryJob};
use super::QueryError;
use crate::endpoints::Endpoints;
use crate::transport::{HttpRequest, Transport};

/// Delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Wall-clock budget from submission to completion.
pub const DEFAULT_POLL_BUDGET: Duration = Duration::from_millis(10_000);

/// Polling cadence and deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each poll.
    pub interval: Duration,
    /// Budget measured from job submission.
    pub budget: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            budget: DEFAULT_POLL_BUDGET,
        }
    }
}

/// Drives one job to completion.
#[derive(Clone)]
pub struct JobPoller {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    policy: PollPolicy,
}

impl JobPoller {
    /// Creates a poller over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints, policy: PollPolicy) -> Self {
        Self {
            transport,
            endpoints,
            policy,
        }
    }

    /// Returns the polling policy.
    #[must_use]
    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Polls `job_id` until it stops running, measuring the budget from `submitted_at`.
    ///
    /// # Errors
    ///
    /// - [`QueryError::PollTimeout`] once the budget is spent
    /// - [`QueryError::Upstream`] / [`QueryError::CaptchaRequired`] when a poll reports them
    /// - [`QueryError::Transport`] / [`QueryError::Protocol`] on the first failed poll
    #[instrument(skip(self, auth_cookie, submitted_at), fields(job_id = %job_id))]
    pub async fn await_completion(
        &self,
        auth_cookie: &str,
        job_id: &JobId,
        submitted_at: Instant,
    ) -> Result<QueryJob, QueryError> {
        let deadline = submitted_at + self.policy.budget;
        let job_key = job_id.to_string();
        let mut polls: u32 = 0;

        loop {
            sleep_until((Instant::now() + self.policy.interval).min(deadline)).await;
            if Instant::now() >= deadline {
                return Err(timed_out(&job_key, submitted_at, polls));
            }

            polls += 1;
            let url = self.endpoints.job_status_url(&job_key, cache_buster());
            let request = HttpRequest::get(url.clone()).with_cookie(auth_cookie);
            let Ok(sent) = timeout_at(deadline, self.transport.send(request)).await else {
                return Err(timed_out(&job_key, submitted_at, polls));
            };
            let job = QueryJob::parse(&url, &sent?.body)?;

            if let Some(failure) = job.failure() {
                warn!(polls, error = %failure, "query job failed");
                return Err(failure);
            }
            if !job.is_running() {
                debug!(polls, "query job completed");
                return Ok(job);
            }
            debug!(polls, "query job still running");
        }
    }
}

fn timed_out(job_id: &str, submitted_at: Instant, polls: u32) -> QueryError {
    let waited_ms = submitted_at.elapsed().as_millis();
    warn!(polls, waited_ms, "query job polling deadline reached");
    QueryError::PollTimeout {
        job_id: job_id.to_string(),
        waited_ms,
    }
}

impl std::fmt::Debug for JobPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPoller")
            .field("endpoints", &self.endpoints)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Milliseconds since the Unix epoch, appended to status URLs to defeat caching.
fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(1000));
        assert_eq!(policy.budget, Duration::from_millis(10_000));
    }

    #[test]
    fn test_cache_buster_is_current_time() {
        assert!(cache_buster() > 1_600_000_000_000);
    }
}
