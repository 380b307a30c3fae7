//! Sequential driver for the login state machines.
//!
//! A flow is an explicit state value. Each state knows the single request it
//! needs and how to turn that request's response into the next state, a final
//! value, or an error. The driver only sends requests; it holds no cookies.

use tracing::debug;

use super::AuthError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Outcome of feeding one response into a state.
#[derive(Debug)]
pub(crate) enum Transition<S, T> {
    /// Continue with another hop.
    Next(S),
    /// The flow finished.
    Done(T),
}

/// One state of a login flow.
pub(crate) trait FlowState: Sized {
    /// Immutable per-attempt inputs (endpoints, credentials, client settings).
    type Context;
    /// Terminal value of the flow.
    type Output;

    /// Step name used in logs and error messages.
    fn step(&self) -> &'static str;

    /// The request this state issues.
    fn request(&self, ctx: &Self::Context) -> HttpRequest;

    /// Consumes the state and the response of its request.
    fn advance(
        self,
        ctx: &Self::Context,
        request_url: &url::Url,
        response: HttpResponse,
    ) -> Result<Transition<Self, Self::Output>, AuthError>;
}

/// Runs `state` to completion, one request at a time.
///
/// # Errors
///
/// Returns the first [`AuthError`] produced by the transport or a transition.
pub(crate) async fn drive<S>(
    transport: &dyn Transport,
    ctx: &S::Context,
    mut state: S,
) -> Result<S::Output, AuthError>
where
    S: FlowState + Send,
    S::Context: Sync,
{
    loop {
        let request = state.request(ctx);
        let request_url = request.url.clone();
        debug!(
            step = state.step(),
            method = %request.method,
            url = %request_url,
            "login hop"
        );
        let response = transport.send(request).await?;
        match state.advance(ctx, &request_url, response)? {
            Transition::Next(next) => state = next,
            Transition::Done(output) => return Ok(output),
        }
    }
}
