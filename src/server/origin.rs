//! Origin whitelist and CORS headers, applied before any route runs.
//!
//! Requests without an `Origin` header are not cross-origin browser calls and
//! pass through. Any other origin must be listed exactly.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE, ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

/// Methods advertised to browsers.
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Request headers advertised to browsers, including the session cookie header.
pub const ALLOWED_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Auth-Cookie";

/// Exact-match list of origins allowed to call the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginWhitelist {
    origins: Vec<String>,
}

impl OriginWhitelist {
    /// Creates a whitelist from configured origins.
    #[must_use]
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    /// Whether a request carrying `origin` may proceed.
    #[must_use]
    pub fn allows(&self, origin: Option<&str>) -> bool {
        origin.is_none_or(|origin| self.origins.iter().any(|allowed| allowed == origin))
    }
}

/// Message returned with the 403 for a rejected origin.
#[must_use]
pub fn rejection_message(origin: &str) -> String {
    format!("The origin \"{origin}\" was not whitelisted by the operator of this proxy.")
}

/// Middleware enforcing the whitelist and answering preflight requests.
pub async fn enforce_origin(
    State(whitelist): State<Arc<OriginWhitelist>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(ORIGIN)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    if !whitelist.allows(origin.as_deref()) {
        let origin = origin.unwrap_or_default();
        warn!(origin = %origin, "rejected request from unlisted origin");
        return (
            StatusCode::FORBIDDEN,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            rejection_message(&origin),
        )
            .into_response();
    }

    let mut response = if request.method() == Method::OPTIONS {
        debug!(uri = %request.uri(), "answering preflight");
        Response::new(Body::empty())
    } else {
        next.run(request).await
    };
    set_cors_headers(response.headers_mut());
    response
}

fn set_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
}
