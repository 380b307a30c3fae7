//! Stateless relay for the Stack Exchange Data Explorer.
//!
//! The data explorer has no authentication API. This library logs in on a
//! caller's behalf by walking the identity provider's HTML login form and
//! redirect chain, hands back the resulting session cookie, and runs or saves
//! queries with it, polling asynchronous jobs to completion.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`transport`] - Manual-redirect HTTP hops
//! - [`auth`] - Cookie extraction, login form parsing and the login flows
//! - [`query`] - Query run/save and deadline-bounded job polling
//! - [`endpoints`] - Upstream base URLs and fixed paths
//! - [`config`] - Environment configuration
//! - [`server`] - Origin whitelist, routes and error mapping

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod query;
pub mod server;
pub mod transport;
mod user_agent;

// Re-export commonly used types
pub use auth::{AccessTokenIssuer, AuthError, Authenticator, Credentials, OAuthClient, SessionToken};
pub use config::{Config, ConfigError};
pub use endpoints::Endpoints;
pub use error::ProtocolViolation;
pub use query::{JobPoller, PollPolicy, QueryClient, QueryError, SavedRevision};
pub use server::{ApiError, AppState, build_router};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
