//! Route handlers. Each one invokes exactly one orchestrator.

use axum::Json;
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::app::AppState;
use super::error::{AUTH_COOKIE_HEADER, ApiError};
use crate::auth::{AccessTokenIssuer, Credentials};
use crate::query::SavedRevision;

/// Body of a successful `POST /auth`.
#[derive(Debug, Serialize)]
pub struct AuthCookieResponse {
    /// Session cookie pair to send back in the `Auth-Cookie` header.
    #[serde(rename = "authCookie")]
    pub auth_cookie: String,
}

/// Liveness payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// Path parameters of `POST /query/run/...`.
#[derive(Debug, Deserialize)]
pub struct RunPath {
    site_id: String,
    query_id: String,
    revision_id: String,
}

/// Path parameters of `POST /query/save/...`.
#[derive(Debug, Deserialize)]
pub struct SavePath {
    site_id: String,
    query_id: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `POST /auth`
pub async fn authenticate(
    State(state): State<AppState>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<Json<AuthCookieResponse>, ApiError> {
    let Form(credentials) = form.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let token = state.authenticator.authenticate(&credentials).await?;
    Ok(Json(AuthCookieResponse {
        auth_cookie: token.into_inner(),
    }))
}

/// `POST /access-token`
pub async fn issue_access_token(
    State(issuer): State<AccessTokenIssuer>,
    form: Result<Form<Credentials>, FormRejection>,
) -> Result<Json<Value>, ApiError> {
    let Form(credentials) = form.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    Ok(Json(issuer.issue(&credentials).await?))
}

/// `POST /query/run/:site_id/:query_id/:revision_id`
pub async fn run_query(
    State(state): State<AppState>,
    Path(path): Path<RunPath>,
    headers: HeaderMap,
    params: String,
) -> Result<Json<Value>, ApiError> {
    let auth_cookie = auth_cookie(&headers)?;
    let result = state
        .queries
        .run(
            auth_cookie,
            &path.site_id,
            &path.query_id,
            &path.revision_id,
            &params,
        )
        .await?;
    Ok(Json(result))
}

/// `POST /query/save/:site_id/:query_id`
pub async fn save_query(
    State(state): State<AppState>,
    Path(path): Path<SavePath>,
    headers: HeaderMap,
    params: String,
) -> Result<Json<SavedRevision>, ApiError> {
    let auth_cookie = auth_cookie(&headers)?;
    let saved = state
        .queries
        .save(auth_cookie, &path.site_id, &path.query_id, &params)
        .await?;
    Ok(Json(saved))
}

fn auth_cookie(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTH_COOKIE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ApiError::MissingAuthHeader)
}
