//! HTTP front door: origin whitelist, routes and error mapping.
//!
//! # Architecture
//!
//! - [`build_router`] / [`AppState`] - Router assembly and shared orchestrators
//! - [`enforce_origin`] - Whitelist and CORS middleware
//! - [`ApiError`] - Failure to status-code mapping

mod app;
mod error;
mod origin;
mod routes;

pub use app::{AppState, build_router};
pub use error::{AUTH_COOKIE_HEADER, ApiError};
pub use origin::{ALLOWED_HEADERS, ALLOWED_METHODS, OriginWhitelist, enforce_origin, rejection_message};
pub use routes::AuthCookieResponse;
