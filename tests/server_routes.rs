//! Front door routes exercised through the router with a scripted upstream.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use sede_proxy::{AppState, Config, OAuthClient, PollPolicy, build_router};
use serde_json::Value;
use tower::ServiceExt;

mod support;
use support::scripted::{ScriptedTransport, ok_json, successful_login_script};

const ALLOWED: &str = "https://sotoolkit.netlify.app";

fn config() -> Config {
    Config {
        origin_whitelist: vec![ALLOWED.to_string()],
        ..Config::default()
    }
}

fn router(transport: &Arc<ScriptedTransport>, config: &Config) -> axum::Router {
    build_router(AppState::new(
        transport.clone(),
        config,
        PollPolicy::default(),
    ))
}

fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let response = router(&transport, &config())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({"status": "ok"}));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_unlisted_origin_rejected_before_any_upstream_call() {
    let transport = Arc::new(ScriptedTransport::new(successful_login_script()));
    let request = post("/auth")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::from("email=a%40b.c&password=x"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        text_body(response).await,
        "The origin \"https://evil.example\" was not whitelisted by the operator of this proxy."
    );
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_preflight_short_circuits_with_cors_headers() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/query/run/1/2/3")
        .header(header::ORIGIN, ALLOWED)
        .body(Body::empty())
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap()
            .contains("Auth-Cookie")
    );
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_auth_returns_session_cookie() {
    let transport = Arc::new(ScriptedTransport::new(successful_login_script()));
    let request = post("/auth")
        .header(header::ORIGIN, ALLOWED)
        .body(Body::from("email=dev%40example.com&password=hunter2"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"authCookie": ".ASPXAUTH=4F1E9C0DEADBEEF"})
    );
    assert_eq!(transport.call_count(), 7);
}

#[tokio::test]
async fn test_auth_without_origin_header_allowed() {
    let transport = Arc::new(ScriptedTransport::new(successful_login_script()));
    let request = post("/auth")
        .body(Body::from("email=dev%40example.com&password=hunter2"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_auth_missing_fields_is_bad_request() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let request = post("/auth")
        .body(Body::from("email=dev%40example.com"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_auth_wrong_password_relays_form_message() {
    let mut script = successful_login_script();
    script[3] = ok_json(r#"<div class="js-error-message">Wrong password</div>"#);
    script.truncate(4);
    let transport = Arc::new(ScriptedTransport::new(script));
    let request = post("/auth")
        .header(header::ORIGIN, ALLOWED)
        .body(Body::from("email=dev%40example.com&password=nope"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(text_body(response).await, r#"{"error":"Wrong password"}"#);
    assert_eq!(transport.call_count(), 4);
}

#[tokio::test]
async fn test_auth_protocol_violation_is_server_error() {
    let transport = Arc::new(ScriptedTransport::new(vec![ok_json("")]));
    let request = post("/auth")
        .body(Body::from("email=a%40b.c&password=x"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("start"));
}

#[tokio::test]
async fn test_query_without_auth_cookie_is_bad_request() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let request = post("/query/run/1/2/3").body(Body::empty()).unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("Auth-Cookie"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_query_run_forwards_params_and_cookie() {
    let transport = Arc::new(ScriptedTransport::new(vec![ok_json(
        r#"{"resultSets":[{"rows":[[7]]}]}"#,
    )]));
    let request = post("/query/run/1/887/1023")
        .header("Auth-Cookie", ".ASPXAUTH=abc")
        .body(Body::from("sql=SELECT+7"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["resultSets"][0]["rows"][0][0], 7);
    let call = &transport.calls()[0];
    assert_eq!(
        call.url.as_str(),
        "https://data.stackexchange.com/query/run/1/887/1023"
    );
    assert_eq!(call.body.as_deref(), Some("sql=SELECT+7"));
    assert_eq!(call.cookie(), Some(".ASPXAUTH=abc"));
}

#[tokio::test]
async fn test_query_upstream_error_is_bad_request() {
    let transport = Arc::new(ScriptedTransport::new(vec![ok_json(
        r#"{"error":"Invalid object name 'Post'."}"#,
    )]));
    let request = post("/query/run/1/2/3")
        .header("Auth-Cookie", ".ASPXAUTH=abc")
        .body(Body::empty())
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"error": "Invalid object name 'Post'."})
    );
}

#[tokio::test(start_paused = true)]
async fn test_query_save_timeout_is_service_unavailable() {
    let transport = Arc::new(ScriptedTransport::repeating(ok_json(
        r#"{"running":true,"job_id":"j"}"#,
    )));
    let request = post("/query/save/1/2")
        .header("Auth-Cookie", ".ASPXAUTH=abc")
        .body(Body::from("sql=SELECT+1"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test(start_paused = true)]
async fn test_query_save_returns_revision_only() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        ok_json(r#"{"running":true,"job_id":"j"}"#),
        ok_json(r#"{"running":false,"revisionId":1024,"resultSets":[]}"#),
    ]));
    let request = post("/query/save/1/2")
        .header("Auth-Cookie", ".ASPXAUTH=abc")
        .body(Body::from("sql=SELECT+1"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"revisionId": 1024})
    );
}

#[tokio::test]
async fn test_access_token_route_absent_without_client() {
    let transport = Arc::new(ScriptedTransport::new(Vec::new()));
    let request = post("/access-token")
        .body(Body::from("email=a%40b.c&password=x"))
        .unwrap();

    let response = router(&transport, &config()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_access_token_route_mounted_with_client() {
    let transport = Arc::new(ScriptedTransport::new(vec![ok_json("")]));
    let config = Config {
        oauth_client: Some(OAuthClient::new("17", "s", "https://relay.example/cb")),
        ..config()
    };
    let request = post("/access-token")
        .body(Body::from("email=a%40b.c&password=x"))
        .unwrap();

    let response = router(&transport, &config).oneshot(request).await.unwrap();

    // No providence cookie on the first hop, so the flow stops there.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(transport.call_count(), 1);
    assert!(
        transport.calls()[0]
            .url
            .as_str()
            .starts_with("https://stackoverflow.com/oauth?client_id=17")
    );
}
