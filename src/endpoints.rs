//! Upstream base URLs and the fixed paths the relay talks to.
//!
//! The paths are an external contract owned by the query service and the
//! identity provider; they are reproduced exactly.

use thiserror::Error;
use url::Url;

/// Default query service (Stack Exchange Data Explorer).
pub const DEFAULT_DATA_EXPLORER_URL: &str = "https://data.stackexchange.com";

/// Default identity provider.
pub const DEFAULT_IDENTITY_URL: &str = "https://stackoverflow.com";

/// Path prefix the identity provider redirects to when it wants a captcha solved.
pub const CAPTCHA_PATH: &str = "/nocaptcha";

/// Errors building an [`Endpoints`] value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The base URL did not parse.
    #[error("invalid {name} base URL '{value}': {reason}")]
    Invalid {
        /// Which base URL was being parsed.
        name: &'static str,
        /// The offending value.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// The base URL cannot carry a path (e.g. `mailto:`).
    #[error("{name} base URL '{value}' cannot be used as an HTTP base")]
    NotABase {
        /// Which base URL was being parsed.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Base URLs of the two upstream services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    data_explorer: Url,
    identity: Url,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            data_explorer: Url::parse(DEFAULT_DATA_EXPLORER_URL)
                .unwrap_or_else(|e| panic!("invalid default data explorer URL: {e}")),
            identity: Url::parse(DEFAULT_IDENTITY_URL)
                .unwrap_or_else(|e| panic!("invalid default identity URL: {e}")),
        }
    }
}

impl Endpoints {
    /// Creates endpoints from two base URLs (used by configuration and tests).
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when either value is not an HTTP base URL.
    pub fn new(data_explorer: &str, identity: &str) -> Result<Self, EndpointError> {
        Ok(Self {
            data_explorer: parse_base("data explorer", data_explorer)?,
            identity: parse_base("identity", identity)?,
        })
    }

    /// Query service base URL.
    #[must_use]
    pub fn data_explorer(&self) -> &Url {
        &self.data_explorer
    }

    /// Identity provider base URL.
    #[must_use]
    pub fn identity(&self) -> &Url {
        &self.identity
    }

    /// `POST` target that starts the broker's OAuth login.
    #[must_use]
    pub fn authenticate_url(&self) -> Url {
        with_segments(&self.data_explorer, &["user", "authenticate"])
    }

    /// The identity provider's `/oauth` endpoint without parameters.
    #[must_use]
    pub fn oauth_url(&self) -> Url {
        with_segments(&self.identity, &["oauth"])
    }

    /// `/oauth` parameterised for this relay's own OAuth client.
    #[must_use]
    pub fn client_oauth_url(&self, client_id: &str, redirect_uri: &str) -> Url {
        let mut url = self.oauth_url();
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri);
        url
    }

    /// Code-for-token exchange endpoint.
    #[must_use]
    pub fn access_token_url(&self) -> Url {
        with_segments(&self.identity, &["oauth", "access_token", "json"])
    }

    /// Query execution endpoint.
    #[must_use]
    pub fn run_query_url(&self, site_id: &str, query_id: &str, revision_id: &str) -> Url {
        with_segments(
            &self.data_explorer,
            &["query", "run", site_id, query_id, revision_id],
        )
    }

    /// Query save endpoint.
    #[must_use]
    pub fn save_query_url(&self, site_id: &str, query_id: &str) -> Url {
        with_segments(&self.data_explorer, &["query", "save", site_id, query_id])
    }

    /// Cache-busted job status endpoint (`...?=<millis>`).
    #[must_use]
    pub fn job_status_url(&self, job_id: &str, cache_buster: u128) -> Url {
        let mut url = with_segments(&self.data_explorer, &["query", "job", job_id]);
        url.set_query(Some(&format!("={cache_buster}")));
        url
    }

    /// Returns true when `url` points at the identity provider's captcha challenge.
    #[must_use]
    pub fn is_captcha_challenge(&self, url: &Url) -> bool {
        url.host_str() == self.identity.host_str() && url.path().starts_with(CAPTCHA_PATH)
    }
}

fn parse_base(name: &'static str, value: &str) -> Result<Url, EndpointError> {
    let url = Url::parse(value.trim()).map_err(|e| EndpointError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(EndpointError::NotABase {
            name,
            value: value.to_string(),
        });
    }
    Ok(url)
}

fn with_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // Bases are validated as non-opaque, so segments are always writable.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
