//! `ReqwestTransport` against a local mock upstream.

use std::time::Duration;

use reqwest::StatusCode;
use sede_proxy::transport::TransportSettings;
use sede_proxy::{HttpRequest, ReqwestTransport, Transport, TransportError};
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(&TransportSettings::default()).unwrap()
}

fn url(base: &str, path: &str) -> Url {
    Url::parse(&format!("{base}{path}")).unwrap()
}

#[tokio::test]
async fn test_redirect_not_followed_and_cookies_exposed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/oauth"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "/users/login")
                .append_header("Set-Cookie", "prov=P1; path=/; HttpOnly")
                .append_header("Set-Cookie", "other=O; path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let response = transport()
        .send(HttpRequest::get(url(&server.uri(), "/oauth")))
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location(), Some("/users/login"));
    assert_eq!(response.final_url, Some(url(&server.uri(), "/oauth")));
    assert_eq!(
        response.set_cookies(),
        vec!["prov=P1; path=/; HttpOnly", "other=O; path=/"]
    );
}

#[tokio::test]
async fn test_opt_in_redirect_following() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/users/login/form"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/login/form"))
        .and(header("cookie", "prov=P1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<form id=\"login-form\"></form>"))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::get(url(&server.uri(), "/users/login"))
        .with_cookie("prov=P1")
        .following_redirects();
    let response = transport().send(request).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("login-form"));
    assert_eq!(
        response.final_url,
        Some(url(&server.uri(), "/users/login/form"))
    );
}

#[tokio::test]
async fn test_form_post_sends_body_and_cookie() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .and(header("cookie", "prov=P1"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("fkey=abc&email=a%40b.c&password=p+w"))
        .respond_with(ResponseTemplate::new(302).insert_header("Set-Cookie", "acct=A1; path=/"))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::post_form(
        url(&server.uri(), "/users/login"),
        [("fkey", "abc"), ("email", "a@b.c"), ("password", "p w")],
    )
    .with_cookie("prov=P1");
    let response = transport().send(request).await.unwrap();

    assert_eq!(response.set_cookies(), vec!["acct=A1; path=/"]);
}

#[tokio::test]
async fn test_sends_relay_user_agent() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header(
            "user-agent",
            TransportSettings::default().user_agent.as_str(),
        ))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = transport()
        .send(HttpRequest::get(url(&server.uri(), "/health")))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_slow_upstream_reports_timeout() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let settings = TransportSettings {
        read_timeout: Duration::from_millis(200),
        ..TransportSettings::default()
    };

    let err = ReqwestTransport::new(&settings)
        .unwrap()
        .send(HttpRequest::get(url(&server.uri(), "/slow")))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout { .. }), "{err:?}");
}

#[tokio::test]
async fn test_unreachable_upstream_reports_network_error() {
    let err = transport()
        .send(HttpRequest::get(Url::parse("http://127.0.0.1:9/").unwrap()))
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            TransportError::Network { .. } | TransportError::Timeout { .. }
        ),
        "{err:?}"
    );
}
