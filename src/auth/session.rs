//! Full login producing the query service's session cookie.
//!
//! The query service and the identity provider live on different domains and
//! are joined by an OAuth2-style redirect chain. After the broker hands off to
//! the identity provider and the handshake succeeds, exactly three redirect
//! hops bring the browser-equivalent back to the query service, which then
//! issues `.ASPXAUTH=`.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use super::cookies::{CapturedCookie, SESSION_COOKIE, find_cookie};
use super::flow::{FlowState, Transition, drive};
use super::handshake::{Handshake, HandshakeStep, redirect_target};
use super::{AuthError, Credentials, SessionToken};
use crate::endpoints::Endpoints;
use crate::error::ProtocolViolation;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Number of redirect hops between login and the session cookie.
///
/// Fixed by the upstream protocol:
/// 1. identity provider `/oauth?client_id=...`
/// 2. `http://` query service OAuth callback with `code`
/// 3. `https://` query service OAuth callback with `code`
pub const OAUTH_REDIRECT_HOPS: u8 = 3;

/// Per-attempt inputs of the session flow.
#[derive(Debug, Clone)]
pub(crate) struct SessionContext {
    endpoints: Endpoints,
    credentials: Credentials,
}

/// States of the session flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// POST to the broker's authenticate endpoint; expect a redirect to the identity provider.
    Start,
    /// Login handshake on the identity provider.
    Login(Handshake),
    /// One hop of the OAuth redirect chain (1-based).
    OAuthHop {
        providence: CapturedCookie,
        account: CapturedCookie,
        url: Url,
        hop: u8,
    },
}

impl FlowState for SessionState {
    type Context = SessionContext;
    type Output = SessionToken;

    fn step(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Login(handshake) => handshake.step(),
            Self::OAuthHop { .. } => "oauth-hop",
        }
    }

    fn request(&self, ctx: &SessionContext) -> HttpRequest {
        match self {
            Self::Start => {
                let oauth_url = ctx.endpoints.oauth_url();
                HttpRequest::post_form(
                    ctx.endpoints.authenticate_url(),
                    [("oauth2url", oauth_url.as_str()), ("openid", "")],
                )
            }
            Self::Login(handshake) => handshake.request(&ctx.credentials),
            Self::OAuthHop {
                providence,
                account,
                url,
                hop,
            } => {
                // The account cookie is only valid on the first cross-domain hop.
                let cookie = if *hop == 1 {
                    providence.joined_with(account)
                } else {
                    providence.as_str().to_string()
                };
                HttpRequest::get(url.clone()).with_cookie(cookie)
            }
        }
    }

    fn advance(
        self,
        ctx: &SessionContext,
        request_url: &Url,
        response: HttpResponse,
    ) -> Result<Transition<Self, SessionToken>, AuthError> {
        match self {
            Self::Start => {
                let login_url = redirect_target("start", request_url, &response)?;
                Ok(Transition::Next(Self::Login(Handshake::start(login_url))))
            }
            Self::Login(handshake) => {
                match handshake.advance(&ctx.endpoints, request_url, response)? {
                    HandshakeStep::Next(next) => Ok(Transition::Next(Self::Login(next))),
                    HandshakeStep::LoggedIn(grant) => Ok(Transition::Next(Self::OAuthHop {
                        providence: grant.providence,
                        account: grant.account,
                        url: grant.redirect_url,
                        hop: 1,
                    })),
                }
            }
            Self::OAuthHop {
                providence,
                account,
                hop,
                ..
            } => {
                if hop < OAUTH_REDIRECT_HOPS {
                    let url = redirect_target("oauth-hop", request_url, &response)?;
                    return Ok(Transition::Next(Self::OAuthHop {
                        providence,
                        account,
                        url,
                        hop: hop + 1,
                    }));
                }
                let session = find_cookie(response.set_cookies(), SESSION_COOKIE)
                    .map(SessionToken::from_set_cookie)
                    .map_err(|_| ProtocolViolation::SessionCookieMissing)?;
                Ok(Transition::Done(session))
            }
        }
    }
}

/// Walks the broker login, the form handshake and the OAuth chain.
///
/// Holds no state between calls; every invocation starts from scratch.
#[derive(Clone)]
pub struct Authenticator {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
}

impl Authenticator {
    /// Creates an authenticator over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Logs in with `credentials` and returns the `.ASPXAUTH=` session cookie.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] hit; no step is retried.
    #[instrument(skip(self, credentials))]
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let ctx = SessionContext {
            endpoints: self.endpoints.clone(),
            credentials: credentials.clone(),
        };
        match drive(self.transport.as_ref(), &ctx, SessionState::Start).await {
            Ok(token) => {
                info!("session cookie obtained");
                Ok(token)
            }
            Err(error) => {
                warn!(error = %error, "authentication failed");
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}
