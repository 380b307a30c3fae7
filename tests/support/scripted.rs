//! In-memory [`Transport`] that replays scripted responses and records every request.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use sede_proxy::{HttpRequest, HttpResponse, Transport, TransportError};

enum Script {
    Queue(VecDeque<Result<HttpResponse, TransportError>>),
    Repeat(HttpResponse),
}

pub struct ScriptedTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Replays `responses` in order; any extra call fails with a timeout error.
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(Script::Queue(results.into())),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Answers every call with `response`.
    pub fn repeating(response: HttpResponse) -> Self {
        Self {
            script: Mutex::new(Script::Repeat(response)),
            calls: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Delays every answer by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_result(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        match &mut *self.script.lock().unwrap() {
            Script::Repeat(response) => Ok(response.clone()),
            Script::Queue(queue) => queue.pop_front().unwrap_or_else(|| {
                Err(TransportError::Timeout {
                    method: request.method.to_string(),
                    url: format!("unscripted call to {}", request.url),
                })
            }),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        let result = self.next_result(&request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        result
    }
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::new(StatusCode::FOUND).with_location(location)
}

pub fn ok_json(body: &str) -> HttpResponse {
    HttpResponse::new(StatusCode::OK).with_body(body)
}

pub const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<form id="login-form" class="grid fd-column" action="/users/login?ssrc=head&amp;returnurl=%2foauth" method="POST">
  <input type="hidden" name="fkey" value="a1b2c3d4e5">
  <input type="hidden" name="ssrc" value="head">
  <input type="email" name="email">
  <input type="password" name="password">
  <div class="js-error-message d-none"></div>
  <button type="submit">Log in</button>
</form>
</body></html>"#;

pub const WRONG_PASSWORD_PAGE: &str = r#"<html><body>
<form id="login-form" action="/users/login" method="POST">
  <input type="hidden" name="fkey" value="a1b2c3d4e5">
  <div class="js-error-message">The email or password is incorrect.</div>
</form>
</body></html>"#;

/// Responses of a successful broker login, in call order.
pub fn successful_login_script() -> Vec<HttpResponse> {
    vec![
        redirect("https://stackoverflow.com/oauth?client_id=2&scope=&redirect_uri=https%3a%2f%2fdata.stackexchange.com%2fuser%2foauth%2fstackoverflow"),
        redirect("/users/login?returnurl=%2foauth%3fclient_id%3d2")
            .with_set_cookie("prov=6c1f2a0e-prov; domain=.stackoverflow.com; expires=Fri, 01-Jan-2055 00:00:00 GMT; path=/; HttpOnly"),
        HttpResponse::new(StatusCode::OK).with_body(LOGIN_PAGE),
        redirect("https://stackoverflow.com/oauth?client_id=2&redirect_uri=https%3a%2f%2fdata.stackexchange.com%2fuser%2foauth%2fstackoverflow")
            .with_set_cookie("acct=t=acct-token&s=acct-sig; domain=.stackoverflow.com; path=/; secure; HttpOnly")
            .with_set_cookie("uauth=1; path=/"),
        redirect("http://data.stackexchange.com/user/oauth/stackoverflow?code=c0de"),
        redirect("https://data.stackexchange.com/user/oauth/stackoverflow?code=c0de"),
        redirect("/")
            .with_set_cookie(".ASPXAUTH=4F1E9C0DEADBEEF; path=/; secure; HttpOnly")
            .with_set_cookie("user=1; path=/"),
    ]
}
