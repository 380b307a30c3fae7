//! Router assembly and shared handler state.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::origin::{OriginWhitelist, enforce_origin};
use super::routes;
use crate::auth::{AccessTokenIssuer, Authenticator};
use crate::config::Config;
use crate::query::{PollPolicy, QueryClient};
use crate::transport::Transport;

/// State shared by every handler. Holds no per-request data.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broker login flow.
    pub authenticator: Authenticator,
    /// OAuth token flow, present only when a client is configured.
    pub access_tokens: Option<AccessTokenIssuer>,
    /// Query run/save.
    pub queries: QueryClient,
    /// Allowed origins.
    pub whitelist: Arc<OriginWhitelist>,
}

impl AppState {
    /// Wires every orchestrator to one shared transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &Config, poll_policy: PollPolicy) -> Self {
        let endpoints = config.endpoints.clone();
        Self {
            authenticator: Authenticator::new(Arc::clone(&transport), endpoints.clone()),
            access_tokens: config.oauth_client.clone().map(|client| {
                AccessTokenIssuer::new(Arc::clone(&transport), endpoints.clone(), client)
            }),
            queries: QueryClient::new(transport, endpoints, poll_policy),
            whitelist: Arc::new(OriginWhitelist::new(config.origin_whitelist.clone())),
        }
    }
}

/// Builds the relay router.
pub fn build_router(state: AppState) -> Router {
    let whitelist = Arc::clone(&state.whitelist);
    let access_tokens = state.access_tokens.clone();

    let mut router = Router::new()
        .route("/health", get(routes::health))
        .route("/auth", post(routes::authenticate))
        .route(
            "/query/run/:site_id/:query_id/:revision_id",
            post(routes::run_query),
        )
        .route("/query/save/:site_id/:query_id", post(routes::save_query))
        .with_state(state);

    if let Some(issuer) = access_tokens {
        router = router.merge(
            Router::new()
                .route("/access-token", post(routes::issue_access_token))
                .with_state(issuer),
        );
    }

    // Layers run bottom-up: tracing wraps the whitelist, which wraps every route.
    router
        .layer(middleware::from_fn_with_state(whitelist, enforce_origin))
        .layer(TraceLayer::new_for_http())
}
