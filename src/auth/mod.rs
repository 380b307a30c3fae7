//! Human-login emulation against the identity provider.
//!
//! The query service has no authentication API, so the relay walks the same
//! HTML login form and OAuth2-style redirect chain a browser would. Every hop
//! is issued without following redirects so cookies can be inspected and
//! re-attached by hand.
//!
//! # Architecture
//!
//! - [`find_cookie`] - Named-cookie lookup over raw `Set-Cookie` values
//! - [`read_login_form`] / [`read_error_message`] - Login page parsing
//! - [`Authenticator`] - Broker login ending in the `.ASPXAUTH=` session cookie
//! - [`AccessTokenIssuer`] - Login ending in an OAuth2 code-for-token exchange
//! - [`AuthError`] - Why a flow stopped

mod access_token;
mod cookies;
mod error;
mod flow;
mod form;
mod handshake;
mod session;

pub use access_token::{AccessTokenIssuer, OAuthClient};
pub use cookies::{
    ACCOUNT_COOKIE, CapturedCookie, CookieNotFound, PROVIDENCE_COOKIE, SESSION_COOKIE,
    cookie_pair, find_cookie,
};
pub use error::AuthError;
pub use form::{
    ANTI_FORGERY_FIELD, FormError, LOGIN_FORM_ID, LoginForm, read_error_message, read_login_form,
};
pub use session::{Authenticator, OAUTH_REDIRECT_HOPS};

use std::fmt;

use serde::Deserialize;

/// Caller-supplied login credentials, used for one attempt and never stored.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Returns the password. Never log the return value.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The `.ASPXAUTH=<value>` cookie pair that authorizes later query calls.
///
/// Opaque to the relay; callers re-send it in the `Auth-Cookie` header.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Captures the `name=value` pair of a raw `Set-Cookie` value.
    #[must_use]
    pub fn from_set_cookie(raw: &str) -> Self {
        Self(cookie_pair(raw).to_string())
    }

    /// Returns the cookie pair. Avoid logging the return value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning the cookie pair.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}
