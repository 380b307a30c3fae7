//! Upstream shape violations shared by the login flows and the job poller.
//!
//! A violation means the external service answered, but not in the shape the
//! relay depends on: an expected header, cookie, form element or JSON field
//! was missing. Each variant names exactly which artifact was absent.

use thiserror::Error;

use crate::auth::FormError;

/// An expected upstream artifact was absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A hop that must redirect returned no `Location` header.
    #[error("expected a redirect at step '{step}' but {url} returned no Location header")]
    MissingRedirect {
        /// Flow step that issued the request.
        step: &'static str,
        /// URL that was requested.
        url: String,
    },

    /// A `Location` header or form action could not be resolved to a URL.
    #[error("step '{step}' produced an unusable URL '{value}'")]
    MalformedUrl {
        /// Flow step that produced the value.
        step: &'static str,
        /// The raw value.
        value: String,
    },

    /// The login page did not issue a providence (`prov=`) cookie.
    #[error("no providence cookie (prov=) was issued by the login page")]
    ProvidenceCookieMissing,

    /// The credential submission response carried no `Set-Cookie` header at all.
    #[error("credential submission returned no cookies")]
    NoCookie,

    /// The credential submission response carried no account (`acct=`) cookie.
    #[error("no account cookie (acct=) was issued after login")]
    AccountCookieMissing,

    /// The final OAuth hop did not issue the `.ASPXAUTH=` session cookie.
    #[error("no session cookie (.ASPXAUTH=) was issued at the end of the OAuth chain")]
    SessionCookieMissing,

    /// The login page did not contain a usable form.
    #[error("login form not found: {0}")]
    FormNotFound(#[from] FormError),

    /// The authorization redirect carried no `code` query parameter.
    #[error("authorization redirect '{location}' carried no code parameter")]
    MissingCode {
        /// The redirect target that lacked the code.
        location: String,
    },

    /// A response that must be JSON could not be parsed.
    #[error("malformed JSON from {url}: {reason}")]
    MalformedJson {
        /// URL that was requested.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A JSON response lacked a field the relay surfaces.
    #[error("response from {url} has no '{field}' field")]
    MissingField {
        /// The missing field name.
        field: &'static str,
        /// URL that was requested.
        url: String,
    },
}
