//! Error types for the login flows.

use thiserror::Error;

use crate::error::ProtocolViolation;
use crate::transport::TransportError;

/// Why a login flow stopped.
///
/// Every step fails fast: the first error ends the flow and no step is retried.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The upstream could not be reached or did not answer in time.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The upstream answered in an unexpected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),

    /// The login form reported a user-facing error.
    #[error("login rejected: {message}\n  Suggestion: Check the email and password and try again")]
    InvalidCredentials {
        /// Text of the form's error element.
        message: String,
    },

    /// The identity provider demands an interactive captcha.
    #[error(
        "captcha required at {redirect_url}\n  Suggestion: Log in once interactively in a browser to clear the captcha, then retry"
    )]
    CaptchaRequired {
        /// The captcha challenge URL.
        redirect_url: String,
    },
}

impl AuthError {
    /// Creates an `InvalidCredentials` error.
    #[must_use]
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            message: message.into(),
        }
    }

    /// Creates a `CaptchaRequired` error.
    #[must_use]
    pub fn captcha_required(redirect_url: impl Into<String>) -> Self {
        Self::CaptchaRequired {
            redirect_url: redirect_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_message() {
        let err = AuthError::invalid_credentials("Wrong password");
        let msg = err.to_string();
        assert!(msg.contains("Wrong password"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_captcha_message_carries_url() {
        let err = AuthError::captcha_required("https://stackoverflow.com/nocaptcha?s=1");
        let msg = err.to_string();
        assert!(msg.contains("/nocaptcha?s=1"));
        assert!(msg.contains("interactively"));
    }

    #[test]
    fn test_protocol_violation_is_transparent() {
        let err: AuthError = ProtocolViolation::AccountCookieMissing.into();
        assert_eq!(
            err.to_string(),
            ProtocolViolation::AccountCookieMissing.to_string()
        );
    }
}
