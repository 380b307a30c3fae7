//! Login-form handshake shared by both login flows.
//!
//! Starting from the identity provider's login URL, the handshake obtains the
//! providence cookie, reads the login form, submits the credentials and
//! validates the result. It ends with a [`LoginGrant`]: the two cookies and
//! the redirect target the flow continues with.

use tracing::debug;
use url::Url;

use super::cookies::{ACCOUNT_COOKIE, CapturedCookie, PROVIDENCE_COOKIE, find_cookie};
use super::form::{ANTI_FORGERY_FIELD, LOGIN_FORM_ID, read_error_message, read_login_form};
use super::{AuthError, Credentials};
use crate::endpoints::Endpoints;
use crate::error::ProtocolViolation;
use crate::transport::{HttpRequest, HttpResponse, resolve_location};

/// Cookies and redirect target produced by a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoginGrant {
    pub(crate) providence: CapturedCookie,
    pub(crate) account: CapturedCookie,
    pub(crate) redirect_url: Url,
}

/// Handshake states, in strict order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Handshake {
    /// GET the login URL without following; expect `prov=` and a redirect.
    FetchLoginPage { login_url: Url },
    /// GET the login-form page with the providence cookie.
    FetchLoginForm {
        providence: CapturedCookie,
        page_url: Url,
    },
    /// POST the credentials to the form's action.
    SubmitCredentials {
        providence: CapturedCookie,
        action_url: Url,
        anti_forgery_token: String,
    },
}

/// Result of one handshake transition.
#[derive(Debug)]
pub(crate) enum HandshakeStep {
    Next(Handshake),
    LoggedIn(LoginGrant),
}

impl Handshake {
    pub(crate) fn start(login_url: Url) -> Self {
        Self::FetchLoginPage { login_url }
    }

    pub(crate) fn step(&self) -> &'static str {
        match self {
            Self::FetchLoginPage { .. } => "fetch-login-page",
            Self::FetchLoginForm { .. } => "fetch-login-form",
            Self::SubmitCredentials { .. } => "submit-credentials",
        }
    }

    pub(crate) fn request(&self, credentials: &Credentials) -> HttpRequest {
        match self {
            Self::FetchLoginPage { login_url } => HttpRequest::get(login_url.clone()),
            Self::FetchLoginForm {
                providence,
                page_url,
            } => HttpRequest::get(page_url.clone())
                .with_cookie(providence.as_str())
                .following_redirects(),
            Self::SubmitCredentials {
                providence,
                action_url,
                anti_forgery_token,
            } => HttpRequest::post_form(
                action_url.clone(),
                [
                    (ANTI_FORGERY_FIELD, anti_forgery_token.as_str()),
                    ("email", credentials.email.as_str()),
                    ("password", credentials.password()),
                ],
            )
            .with_cookie(providence.as_str()),
        }
    }

    pub(crate) fn advance(
        self,
        endpoints: &Endpoints,
        request_url: &Url,
        response: HttpResponse,
    ) -> Result<HandshakeStep, AuthError> {
        match self {
            Self::FetchLoginPage { .. } => {
                let providence = find_cookie(response.set_cookies(), PROVIDENCE_COOKIE)
                    .map(CapturedCookie::from_set_cookie)
                    .map_err(|_| ProtocolViolation::ProvidenceCookieMissing)?;
                let page_url = redirect_target("fetch-login-page", request_url, &response)?;
                Ok(HandshakeStep::Next(Self::FetchLoginForm {
                    providence,
                    page_url,
                }))
            }
            Self::FetchLoginForm { providence, .. } => {
                let form = read_login_form(&response.body, LOGIN_FORM_ID)
                    .map_err(ProtocolViolation::from)?;
                let base_url = response.base_url(request_url);
                let action_url = resolve_location(&form.action_url, base_url).ok_or_else(
                    || ProtocolViolation::MalformedUrl {
                        step: "fetch-login-form",
                        value: form.action_url.clone(),
                    },
                )?;
                Ok(HandshakeStep::Next(Self::SubmitCredentials {
                    providence,
                    action_url,
                    anti_forgery_token: form.anti_forgery_token,
                }))
            }
            Self::SubmitCredentials { providence, .. } => {
                validate_login_result(endpoints, request_url, &response, providence)
                    .map(HandshakeStep::LoggedIn)
            }
        }
    }
}

/// Checks the credential submission response.
///
/// Order: form error element, captcha redirect, any cookie at all, account
/// cookie, redirect target. A captcha redirect carries no account cookie, so
/// it is recognised before the cookie checks.
pub(crate) fn validate_login_result(
    endpoints: &Endpoints,
    request_url: &Url,
    response: &HttpResponse,
    providence: CapturedCookie,
) -> Result<LoginGrant, AuthError> {
    if let Some(message) = read_error_message(&response.body) {
        debug!(status = response.status.as_u16(), "login form reported an error");
        return Err(AuthError::invalid_credentials(message));
    }

    let redirect_url = response
        .location()
        .map(|location| {
            resolve_location(location, request_url).ok_or_else(|| {
                ProtocolViolation::MalformedUrl {
                    step: "submit-credentials",
                    value: location.to_string(),
                }
            })
        })
        .transpose()?;

    if let Some(url) = &redirect_url
        && endpoints.is_captcha_challenge(url)
    {
        return Err(AuthError::captcha_required(url.as_str()));
    }

    let set_cookies = response.set_cookies();
    if set_cookies.is_empty() {
        return Err(ProtocolViolation::NoCookie.into());
    }
    let account = find_cookie(set_cookies, ACCOUNT_COOKIE)
        .map(CapturedCookie::from_set_cookie)
        .map_err(|_| ProtocolViolation::AccountCookieMissing)?;

    let redirect_url = redirect_url.ok_or_else(|| ProtocolViolation::MissingRedirect {
        step: "submit-credentials",
        url: request_url.to_string(),
    })?;

    Ok(LoginGrant {
        providence,
        account,
        redirect_url,
    })
}

/// Returns the resolved `Location` of a hop that must redirect.
pub(crate) fn redirect_target(
    step: &'static str,
    request_url: &Url,
    response: &HttpResponse,
) -> Result<Url, ProtocolViolation> {
    let location = response
        .location()
        .ok_or_else(|| ProtocolViolation::MissingRedirect {
            step,
            url: request_url.to_string(),
        })?;
    if !response.status.is_redirection() {
        debug!(
            step,
            status = response.status.as_u16(),
            "Location header on a non-redirect status"
        );
    }
    resolve_location(location, request_url).ok_or_else(|| ProtocolViolation::MalformedUrl {
        step,
        value: location.to_string(),
    })
}
