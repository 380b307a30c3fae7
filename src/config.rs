//! Process configuration loaded once from the environment at startup.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::auth::OAuthClient;
use crate::endpoints::{DEFAULT_DATA_EXPLORER_URL, DEFAULT_IDENTITY_URL, EndpointError, Endpoints};
use crate::transport::TransportSettings;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Origin added to the whitelist when `APP_ENV=development`.
pub const DEVELOPMENT_ORIGIN: &str = "http://localhost:3000";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Errors turning environment values into a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set to a value that cannot be used.
    #[error("{name}='{value}' is invalid: {reason}\n  Suggestion: Fix or unset {name}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The offending value.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// One variable of a group is set while a companion is missing.
    #[error("{present} is set but {missing} is not\n  Suggestion: Set both, or neither to disable /access-token")]
    Incomplete {
        /// The variable that is set.
        present: &'static str,
        /// The companion that is missing.
        missing: &'static str,
    },

    /// An upstream base URL is unusable.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Immutable process-wide settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origins allowed to call the relay.
    pub origin_whitelist: Vec<String>,
    /// Listen port.
    pub port: u16,
    /// Upstream base URLs.
    pub endpoints: Endpoints,
    /// OAuth client for `/access-token`; `None` leaves the route unmounted.
    pub oauth_client: Option<OAuthClient>,
    /// Upstream connect bound.
    pub connect_timeout: Duration,
    /// Upstream whole-request bound.
    pub read_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin_whitelist: Vec::new(),
            port: DEFAULT_PORT,
            endpoints: Endpoints::default(),
            oauth_client: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first unusable variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first unusable variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut origin_whitelist: Vec<String> = var("ORIGIN_WHITELIST")
            .map(|list| parse_origins(&list))
            .unwrap_or_default();
        if var("APP_ENV").is_some_and(|value| value.trim() == "development")
            && !origin_whitelist.iter().any(|origin| origin == DEVELOPMENT_ORIGIN)
        {
            origin_whitelist.push(DEVELOPMENT_ORIGIN.to_string());
        }

        let port = match var("PORT") {
            Some(value) => parse_number("PORT", &value)?,
            None => DEFAULT_PORT,
        };

        let endpoints = Endpoints::new(
            var("DATA_EXPLORER_URL").as_deref().unwrap_or(DEFAULT_DATA_EXPLORER_URL),
            var("IDENTITY_URL").as_deref().unwrap_or(DEFAULT_IDENTITY_URL),
        )?;

        let oauth_client = match (var("CLIENT_ID"), var("CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => {
                let redirect_uri = var("OAUTH_REDIRECT_URI").ok_or(ConfigError::Incomplete {
                    present: "CLIENT_ID",
                    missing: "OAUTH_REDIRECT_URI",
                })?;
                Some(OAuthClient::new(client_id, client_secret, redirect_uri))
            }
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "CLIENT_ID",
                    missing: "CLIENT_SECRET",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "CLIENT_SECRET",
                    missing: "CLIENT_ID",
                });
            }
            (None, None) => None,
        };

        let connect_timeout = seconds(
            "UPSTREAM_CONNECT_TIMEOUT_SECS",
            var("UPSTREAM_CONNECT_TIMEOUT_SECS"),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;
        let read_timeout = seconds(
            "UPSTREAM_READ_TIMEOUT_SECS",
            var("UPSTREAM_READ_TIMEOUT_SECS"),
            DEFAULT_READ_TIMEOUT_SECS,
        )?;

        Ok(Self {
            origin_whitelist,
            port,
            endpoints,
            oauth_client,
            connect_timeout,
            read_timeout,
        })
    }

    /// Transport settings derived from the configured timeouts.
    #[must_use]
    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            ..TransportSettings::default()
        }
    }
}

fn parse_origins(list: &str) -> Vec<String> {
    list.split(',')
        .map(|origin| origin.trim().trim_end_matches('/'))
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn seconds(name: &'static str, value: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let secs = match value {
        Some(value) => {
            let secs: u64 = parse_number(name, &value)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    value,
                    reason: "must be at least 1 second".to_string(),
                });
            }
            secs
        }
        None => default,
    };
    Ok(Duration::from_secs(secs))
}
