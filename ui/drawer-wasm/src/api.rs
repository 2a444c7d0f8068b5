//! HTTP transport.
//!
//! `FetchTransport` posts JSON with credentials through `gloo-net` and aborts
//! the request through an `AbortController` once the timeout fires.
//! Extend by adding headers (e.g. the stored auth token) in `post_json`.

use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use od_drawer_core::{HttpReply, Sleeper, Transport, TransportError};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use web_sys::{AbortController, RequestCredentials};

pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        let controller =
            AbortController::new().map_err(|e| TransportError::Network(format!("{:?}", e)))?;
        let timed_out = Rc::new(Cell::new(false));

        // Dropping the guard clears the timer.
        let _guard = {
            let controller = controller.clone();
            let timed_out = timed_out.clone();
            Timeout::new(millis(timeout), move || {
                timed_out.set(true);
                controller.abort();
            })
        };

        let request = Request::post(url)
            .credentials(RequestCredentials::Include)
            .abort_signal(Some(&controller.signal()))
            .json(body)
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let outcome = read(request.send().await).await;
        outcome.map_err(|e| {
            if timed_out.get() {
                TransportError::TimedOut
            } else {
                TransportError::Network(e.to_string())
            }
        })
    }
}

async fn read(sent: Result<Response, gloo_net::Error>) -> Result<HttpReply, gloo_net::Error> {
    let response = sent?;
    let status = response.status();
    let body = response.text().await?;
    Ok(HttpReply { status, body })
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

pub struct GlooSleeper;

#[async_trait(?Send)]
impl Sleeper for GlooSleeper {
    async fn sleep(&self, duration: Duration) {
        TimeoutFuture::new(millis(duration)).await;
    }
}

/// GET a URL and return the body as a plain string.
pub async fn fetch_text(url: &str) -> Result<String, String> {
    let response = Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {}", e))?;
    if !response.ok() {
        return Err(format!("{} {}", response.status(), response.status_text()));
    }
    response
        .text()
        .await
        .map_err(|e| format!("text error: {}", e))
}
