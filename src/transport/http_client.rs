//! Shared HTTP client construction policy for upstream traffic.
//!
//! Both clients share timeouts, user-agent and compression settings; they
//! differ only in redirect policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, instrument};

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::user_agent;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Redirect limit for the few requests that opt into following.
const MAX_FOLLOWED_REDIRECTS: usize = 10;

/// Timeouts and identity applied to every upstream request.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    /// TCP/TLS connect bound.
    pub connect_timeout: Duration,
    /// Whole-request bound, including the body.
    pub read_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: user_agent::default_relay_user_agent(),
        }
    }
}

/// [`Transport`] backed by two pooled `reqwest` clients.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    manual: Client,
    following: Client,
}

impl ReqwestTransport {
    /// Builds the transport from `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when client construction fails.
    pub fn new(settings: &TransportSettings) -> Result<Self, TransportError> {
        let manual = base_builder(settings)
            .redirect(Policy::none())
            .build()
            .map_err(TransportError::ClientBuild)?;
        let following = base_builder(settings)
            .redirect(Policy::limited(MAX_FOLLOWED_REDIRECTS))
            .build()
            .map_err(TransportError::ClientBuild)?;
        Ok(Self { manual, following })
    }
}

fn base_builder(settings: &TransportSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.read_timeout)
        .user_agent(settings.user_agent.clone())
        .gzip(true)
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.manual
        };
        let method = request.method.to_string();
        let url = request.url.to_string();

        let mut builder = client.request(request.method, request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::from_send(&method, &url, source))?;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Body {
                url: url.clone(),
                source,
            })?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            final_url = %final_url,
            "upstream response"
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
            final_url: Some(final_url),
        })
    }
}
