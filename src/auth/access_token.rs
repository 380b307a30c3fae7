//! Login ending in an OAuth2 code-for-token exchange.
//!
//! Instead of the broker, the flow starts at the identity provider's `/oauth`
//! endpoint parameterised with this relay's own client. After the handshake
//! one hop yields the authorization `code`, which is exchanged for the
//! provider's access-token JSON.

use std::fmt;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use url::Url;

use super::cookies::CapturedCookie;
use super::flow::{FlowState, Transition, drive};
use super::handshake::{Handshake, HandshakeStep, redirect_target};
use super::{AuthError, Credentials};
use crate::endpoints::Endpoints;
use crate::error::ProtocolViolation;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Registered OAuth client this relay authenticates as.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClient {
    /// Public client id.
    pub client_id: String,
    client_secret: String,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
}

impl OAuthClient {
    /// Creates a client description.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    /// Returns the client secret. Never log the return value.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AccessTokenContext {
    endpoints: Endpoints,
    credentials: Credentials,
    client: OAuthClient,
}

/// States of the access-token flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AccessTokenState {
    /// Login handshake starting at the client's `/oauth` URL.
    Login(Handshake),
    /// Follow the post-login redirect to obtain the authorization code.
    Authorize {
        providence: CapturedCookie,
        account: CapturedCookie,
        url: Url,
    },
    /// Exchange the code for the access token.
    Exchange { code: String },
}

impl FlowState for AccessTokenState {
    type Context = AccessTokenContext;
    type Output = serde_json::Value;

    fn step(&self) -> &'static str {
        match self {
            Self::Login(handshake) => handshake.step(),
            Self::Authorize { .. } => "authorize",
            Self::Exchange { .. } => "exchange-code",
        }
    }

    fn request(&self, ctx: &AccessTokenContext) -> HttpRequest {
        match self {
            Self::Login(handshake) => handshake.request(&ctx.credentials),
            Self::Authorize {
                providence,
                account,
                url,
            } => HttpRequest::get(url.clone()).with_cookie(providence.joined_with(account)),
            Self::Exchange { code } => HttpRequest::post_form(
                ctx.endpoints.access_token_url(),
                [
                    ("client_id", ctx.client.client_id.as_str()),
                    ("client_secret", ctx.client.client_secret()),
                    ("redirect_uri", ctx.client.redirect_uri.as_str()),
                    ("code", code.as_str()),
                ],
            ),
        }
    }

    fn advance(
        self,
        ctx: &AccessTokenContext,
        request_url: &Url,
        response: HttpResponse,
    ) -> Result<Transition<Self, serde_json::Value>, AuthError> {
        match self {
            Self::Login(handshake) => {
                match handshake.advance(&ctx.endpoints, request_url, response)? {
                    HandshakeStep::Next(next) => Ok(Transition::Next(Self::Login(next))),
                    HandshakeStep::LoggedIn(grant) => Ok(Transition::Next(Self::Authorize {
                        providence: grant.providence,
                        account: grant.account,
                        url: grant.redirect_url,
                    })),
                }
            }
            Self::Authorize { .. } => {
                let location = redirect_target("authorize", request_url, &response)?;
                let code = location
                    .query_pairs()
                    .find(|(name, value)| name == "code" && !value.is_empty())
                    .map(|(_, value)| value.into_owned())
                    .ok_or_else(|| ProtocolViolation::MissingCode {
                        location: location.to_string(),
                    })?;
                Ok(Transition::Next(Self::Exchange { code }))
            }
            Self::Exchange { .. } => serde_json::from_str(&response.body)
                .map(Transition::Done)
                .map_err(|e| {
                    ProtocolViolation::MalformedJson {
                        url: request_url.to_string(),
                        reason: e.to_string(),
                    }
                    .into()
                }),
        }
    }
}

/// Obtains an access token for this relay's OAuth client on behalf of a user.
#[derive(Clone)]
pub struct AccessTokenIssuer {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    client: OAuthClient,
}

impl AccessTokenIssuer {
    /// Creates an issuer over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoints: Endpoints, client: OAuthClient) -> Self {
        Self {
            transport,
            endpoints,
            client,
        }
    }

    /// Logs in with `credentials` and returns the provider's token payload verbatim.
    ///
    /// # Errors
    ///
    /// Returns the first [`AuthError`] hit; no step is retried.
    #[instrument(skip(self, credentials), fields(client_id = %self.client.client_id))]
    pub async fn issue(&self, credentials: &Credentials) -> Result<serde_json::Value, AuthError> {
        let ctx = AccessTokenContext {
            endpoints: self.endpoints.clone(),
            credentials: credentials.clone(),
            client: self.client.clone(),
        };
        let login_url = self
            .endpoints
            .client_oauth_url(&self.client.client_id, &self.client.redirect_uri);
        let state = AccessTokenState::Login(Handshake::start(login_url));

        match drive(self.transport.as_ref(), &ctx, state).await {
            Ok(token) => {
                info!("access token issued");
                Ok(token)
            }
            Err(error) => {
                warn!(error = %error, "access token flow failed");
                Err(error)
            }
        }
    }
}

impl fmt::Debug for AccessTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenIssuer")
            .field("endpoints", &self.endpoints)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
