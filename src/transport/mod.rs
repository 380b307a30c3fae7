//! Manual-redirect HTTP transport used by every upstream step.
//!
//! The login handshake has to inspect and re-attach cookies at each hop, so
//! requests never follow redirects unless the caller opts in per request.
//!
//! # Architecture
//!
//! - [`Transport`] - Async trait the orchestrators and poller drive
//! - [`HttpRequest`] / [`HttpResponse`] - One hop in, one hop out
//! - [`ReqwestTransport`] - Production implementation backed by `reqwest`
//! - [`TransportError`] - Network, timeout and client construction failures

mod error;
mod http_client;

pub use error::TransportError;
pub use http_client::{ReqwestTransport, TransportSettings};

use std::fmt;

use async_trait::async_trait;
use reqwest::header::{
    CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, LOCATION, SET_COOKIE,
};
use reqwest::{Method, StatusCode};
use url::Url;

/// Content type used for every form body sent upstream.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A single outbound request.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL.
    pub url: Url,
    /// Extra request headers, in insertion order.
    pub headers: Vec<(HeaderName, String)>,
    /// Form-encoded body, if any.
    pub body: Option<String>,
    /// Whether the transport may follow redirects for this request.
    pub follow_redirects: bool,
}

impl HttpRequest {
    /// Creates a request with no headers, no body and redirects disabled.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            follow_redirects: false,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a `POST` request whose body is the form encoding of `pairs`.
    #[must_use]
    pub fn post_form<'a, I>(url: Url, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::post_encoded(url, body)
    }

    /// Creates a `POST` request carrying an already form-encoded body verbatim.
    #[must_use]
    pub fn post_encoded(url: Url, body: impl Into<String>) -> Self {
        let mut request = Self::new(Method::POST, url);
        request.body = Some(body.into());
        request.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Attaches a `Cookie` header.
    #[must_use]
    pub fn with_cookie(self, cookie: impl Into<String>) -> Self {
        self.header(COOKIE, cookie)
    }

    /// Lets the transport follow redirects for this request.
    #[must_use]
    pub fn following_redirects(mut self) -> Self {
        self.follow_redirects = true;
        self
    }

    /// Returns the attached `Cookie` header, if any.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| *name == COOKIE)
            .map(|(_, value)| value.as_str())
    }
}

// Cookie headers carry session material; only their presence is shown.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &header_names)
            .field("has_body", &self.body.is_some())
            .field("follow_redirects", &self.follow_redirects)
            .finish()
    }
}

/// Status, headers and body of one upstream response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Response status.
    pub status: StatusCode,
    /// Raw headers; `Set-Cookie` may appear several times.
    pub headers: HeaderMap,
    /// Body decoded as text.
    pub body: String,
    /// URL the response came from once followed redirects settled.
    pub final_url: Option<Url>,
}

impl HttpResponse {
    /// Creates an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: String::new(),
            final_url: None,
        }
    }

    /// Appends a header value. Values that are not valid header text are skipped.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Appends a `Set-Cookie` header.
    #[must_use]
    pub fn with_set_cookie(self, cookie: &str) -> Self {
        self.with_header(SET_COOKIE, cookie)
    }

    /// Sets the `Location` header.
    #[must_use]
    pub fn with_location(self, location: &str) -> Self {
        self.with_header(LOCATION, location)
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Records the URL the response was finally served from.
    #[must_use]
    pub fn with_final_url(mut self, url: Url) -> Self {
        self.final_url = Some(url);
        self
    }

    /// Base for resolving relative links in this response: the final URL
    /// when redirects were followed, `request_url` otherwise.
    #[must_use]
    pub fn base_url<'a>(&'a self, request_url: &'a Url) -> &'a Url {
        self.final_url.as_ref().unwrap_or(request_url)
    }

    /// Returns the first `Location` header value.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Returns every `Set-Cookie` header value, in order.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }
}

/// Sends one request without any hidden redirect or cookie handling.
///
/// This trait uses `async_trait` so orchestrators can hold an
/// `Arc<dyn Transport>` and tests can substitute a scripted implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues `request` and returns the raw response, whatever its status.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Resolves a `Location` header or form action against the URL that produced it.
#[must_use]
pub fn resolve_location(value: &str, base: &Url) -> Option<Url> {
    if value.starts_with("//") {
        return Url::parse(&format!("{}:{value}", base.scheme())).ok();
    }
    base.join(value).ok()
}
